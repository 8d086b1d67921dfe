// Copyright 2025 Justin Hu
//
// This file is part of Iron Front.
//
// Iron Front is free software: you can redistribute it and/or modify it under
// the terms of the GNU Affero General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Iron Front is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with Iron Front. If not, see <https://www.gnu.org/licenses/>.
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Deployment and turn timers
//!
//! Timers are never cancelled. Each one remembers what it was started for and
//! the server checks that against the current game when it fires

use std::time::Duration;

use iron_front_common::message::GameId;
use tokio::{sync::mpsc::UnboundedReceiver, time::sleep};
use tracing::debug;

use crate::server::{SharedServer, lock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Force the game to start
    Deployment,
    /// End the turn with this number
    Turn(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerRequest {
    pub game: GameId,
    pub timer: TimerKind,
    pub after: Duration,
}

/// Start a single-shot task per request until the server goes away
pub async fn run_timers(mut requests: UnboundedReceiver<TimerRequest>, server: SharedServer) {
    while let Some(request) = requests.recv().await {
        debug!(game = %request.game, timer = ?request.timer, after = ?request.after, "timer started");
        let server = server.clone();
        tokio::spawn(async move {
            sleep(request.after).await;
            lock(&server).on_timer_expired(request.game, request.timer);
        });
    }
}
