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

//! Game content loaded at start-up

use std::{
    collections::BTreeMap,
    fs::{read, read_dir},
    path::Path,
    sync::Arc,
};

use anyhow::{Context, Result, bail};
use iron_front_common::{map::Map, unit::Faction};
use serde_cbor::from_slice;
use tracing::{debug, info};

/// Factions and maps games are played with
#[derive(Debug, Clone)]
pub struct Content {
    pub factions: Vec<Arc<Faction>>,
    pub maps: BTreeMap<String, Map>,
}

impl Content {
    /// Read a CBOR list of factions and every `.cbor` map in a directory
    pub fn load(factions: &Path, maps: &Path) -> Result<Self> {
        let file = read(factions)
            .with_context(|| format!("while reading {}", factions.to_string_lossy()))?;
        let factions: Vec<Arc<Faction>> = from_slice(&file)
            .with_context(|| format!("while deserializing {}", factions.to_string_lossy()))?;
        if factions.is_empty() {
            bail!("no factions defined");
        }

        let mut loaded = BTreeMap::new();
        for entry in
            read_dir(maps).with_context(|| format!("while listing {}", maps.to_string_lossy()))?
        {
            let path = entry
                .with_context(|| format!("while listing {}", maps.to_string_lossy()))?
                .path();
            if path.extension().is_none_or(|extension| extension != "cbor") {
                debug!(path = %path.to_string_lossy(), "skipping non-map file");
                continue;
            }
            let file =
                read(&path).with_context(|| format!("while reading {}", path.to_string_lossy()))?;
            let map: Map = from_slice(&file)
                .with_context(|| format!("while deserializing {}", path.to_string_lossy()))?;
            if loaded.contains_key(map.name()) {
                bail!("map {} is defined twice", map.name());
            }
            loaded.insert(map.name().to_string(), map);
        }
        if loaded.is_empty() {
            bail!("no maps found in {}", maps.to_string_lossy());
        }

        info!(
            factions = factions.len(),
            maps = loaded.len(),
            "loaded game content"
        );
        Ok(Self {
            factions,
            maps: loaded,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        env::temp_dir,
        fs::{create_dir_all, remove_dir_all, write},
        path::PathBuf,
    };

    use iron_front_common::{
        PlayerId, Position,
        map::{Hex, TerrainType},
        unit::{UnitClass, UnitStats, UnitType},
    };
    use serde_cbor::to_vec;

    use super::*;

    pub(crate) fn faction() -> Arc<Faction> {
        Arc::new(Faction {
            name: "Testers".to_string(),
            description: String::new(),
            units: vec![Arc::new(UnitType {
                name: "Rifles".to_string(),
                points: 100,
                limit: None,
                class: UnitClass::Infantry,
                hardness: 0.0,
                stats: UnitStats {
                    soft_attack: 4,
                    hard_attack: 1,
                    soft_defence: 4,
                    hard_defence: 2,
                    range: 1,
                    movement: 3,
                    ..Default::default()
                },
                upgrades: Vec::new(),
            })],
        })
    }

    /// Five columns of clear hexes, three deep; the outer columns are the
    /// deployment zones
    pub(crate) fn map(name: &str) -> Map {
        let mut hexes = Vec::new();
        for x in 0..5 {
            for y in 0..3 {
                let mut hex = Hex::new(Position::new(x, y), TerrainType::Clear);
                let zone = match x {
                    0 => Some(PlayerId::Player1),
                    4 => Some(PlayerId::Player2),
                    _ => None,
                };
                hex.initial_deployment_zone = zone;
                hex.supply = zone;
                hexes.push(hex);
            }
        }
        Map::new(name.to_string(), hexes, Vec::new()).expect("valid map")
    }

    pub(crate) fn content() -> Content {
        Content {
            factions: vec![faction()],
            maps: BTreeMap::from([("plains".to_string(), map("plains"))]),
        }
    }

    fn scratch(name: &str) -> PathBuf {
        let path = temp_dir().join(format!("iron_front_{name}_{}", std::process::id()));
        let _ = remove_dir_all(&path);
        create_dir_all(path.join("maps")).expect("writable temp dir");
        path
    }

    #[test]
    fn loads_factions_and_maps() {
        let root = scratch("load");
        write(
            root.join("factions.cbor"),
            to_vec(&vec![faction()]).expect("serializable"),
        )
        .expect("writable");
        write(
            root.join("maps/plains.cbor"),
            to_vec(&map("plains")).expect("serializable"),
        )
        .expect("writable");
        write(root.join("maps/README"), b"not a map").expect("writable");

        let content =
            Content::load(&root.join("factions.cbor"), &root.join("maps")).expect("valid content");
        assert_eq!(content.factions, vec![faction()]);
        let plains = content.maps.get("plains").expect("loaded");
        assert_eq!(plains.hexes().len(), 15);
        assert_eq!(
            plains
                .hex(Position::new(4, 2))
                .and_then(|hex| hex.owner),
            Some(PlayerId::Player2)
        );
        remove_dir_all(root).expect("removable");
    }

    #[test]
    fn missing_content_is_an_error() {
        let root = scratch("missing");
        assert!(Content::load(&root.join("factions.cbor"), &root.join("maps")).is_err());

        write(
            root.join("factions.cbor"),
            to_vec(&vec![faction()]).expect("serializable"),
        )
        .expect("writable");
        let error = Content::load(&root.join("factions.cbor"), &root.join("maps"))
            .expect_err("no maps");
        assert!(error.to_string().starts_with("no maps found"));
        remove_dir_all(root).expect("removable");
    }
}
