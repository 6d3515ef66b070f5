use std::{path::Path, sync::Arc};

use tabled::Table;

use crate::{
    archive::CollectionReader,
    failure, info,
    management::{ConfigBuilder, TokenManager},
    spotify::{PlaylistApi, SpotifyClient},
    success,
    types::{OwnedCollection, OwnedPlaylistTableRow},
    utils, warning,
};

use super::archive::{EXIT_AUTH, EXIT_CONFIG, spinner};

/// Default file edited by `plarchive config`.
pub const DEFAULT_CONFIG_FILE: &str = "playlists_config.json";

pub async fn config_add(path: &Path, playlist: &str, name: Option<String>, verify: bool) -> i32 {
    let builder = match ConfigBuilder::load(path).await {
        Ok(builder) => builder,
        Err(e) => {
            failure!("{}", e);
            return EXIT_CONFIG;
        }
    };

    let builder = match builder.add(playlist, name) {
        Ok(builder) => builder,
        Err(e) => {
            failure!("{}", e);
            return EXIT_CONFIG;
        }
    };

    // `add` succeeded, so the last entry is the one just added.
    let Some(entry) = builder.entries().last().cloned() else {
        return EXIT_CONFIG;
    };

    if utils::is_algorithmic_playlist(&entry.source_id) {
        warning!(
            "{} looks like a Spotify algorithmic playlist; these are blocked from API access",
            entry.source_id
        );
    }

    if verify {
        let tokens = match TokenManager::load_or_bootstrap().await {
            Ok(tokens) => tokens,
            Err(e) => {
                failure!("{}", e);
                return EXIT_AUTH;
            }
        };
        let reader = CollectionReader::new(Arc::new(SpotifyClient::new(tokens)));

        match reader.read_snapshot(&entry.source_id).await {
            Ok(snapshot) => {
                info!("Name: {}", snapshot.name);
                info!("Owner: {}", snapshot.owner_id);
                info!("Tracks: {}", snapshot.item_count);
                info!(
                    "Archive: {}",
                    utils::archive_name(&snapshot.name, entry.custom_name.as_deref())
                );
            }
            Err(e) => {
                failure!("Cannot read playlist {}: {}", entry.source_id, e);
                return 1;
            }
        }
    }

    if let Err(e) = builder.save(path).await {
        failure!("Failed to save {}: {}", path.display(), e);
        return 1;
    }

    success!(
        "Added {} to {} ({} playlist(s))",
        entry.source_id,
        path.display(),
        builder.entries().len()
    );
    0
}

pub async fn config_remove(path: &Path, playlist: &str) -> i32 {
    let result = match ConfigBuilder::load(path).await {
        Ok(builder) => builder.remove(playlist),
        Err(e) => Err(e),
    };

    let builder = match result {
        Ok(builder) => builder,
        Err(e) => {
            failure!("{}", e);
            return EXIT_CONFIG;
        }
    };

    if let Err(e) = builder.save(path).await {
        failure!("Failed to save {}: {}", path.display(), e);
        return 1;
    }

    success!(
        "Removed {} from {} ({} playlist(s) left)",
        playlist,
        path.display(),
        builder.entries().len()
    );
    0
}

/// Prints the configured playlists, or with `json` the single-line array to
/// paste into `SPOTIFY_PLAYLISTS_CONFIG`.
pub async fn config_list(path: &Path, json: bool) -> i32 {
    let builder = match ConfigBuilder::load(path).await {
        Ok(builder) => builder,
        Err(e) => {
            failure!("{}", e);
            return EXIT_CONFIG;
        }
    };

    if json {
        match serde_json::to_string(builder.entries()) {
            Ok(line) => println!("{line}"),
            Err(e) => {
                failure!("{}", e);
                return 1;
            }
        }
        return 0;
    }

    if builder.entries().is_empty() {
        warning!("No playlists configured in {}", path.display());
        return 0;
    }

    println!("{}", Table::new(builder.table_rows()));
    0
}

/// Prints the playlists the current account owns, marking the ones already
/// in the configuration file. Archive playlists are left out.
pub async fn config_list_remote(path: &Path) -> i32 {
    let builder = match ConfigBuilder::load(path).await {
        Ok(builder) => builder,
        Err(e) => {
            failure!("{}", e);
            return EXIT_CONFIG;
        }
    };

    let tokens = match TokenManager::load_or_bootstrap().await {
        Ok(tokens) => tokens,
        Err(e) => {
            failure!("{}", e);
            return EXIT_AUTH;
        }
    };
    let api = Arc::new(SpotifyClient::new(tokens));
    let reader = CollectionReader::new(Arc::clone(&api) as Arc<dyn PlaylistApi>);

    let spinner = spinner();
    spinner.set_message("Reading your playlists...");
    let listing = match api.current_user_id().await {
        Ok(user_id) => reader
            .read_owned_collections()
            .await
            .map(|collections| (user_id, collections)),
        Err(e) => Err(e),
    };
    spinner.finish_and_clear();

    let (user_id, collections) = match listing {
        Ok(listing) => listing,
        Err(e) => {
            failure!("Cannot read your playlists: {}", e);
            return if e.is_auth() { EXIT_AUTH } else { 1 };
        }
    };

    let rows = owned_playlist_rows(&collections, &user_id, &builder);
    if rows.is_empty() {
        warning!("No playlists owned by {} were found", user_id);
        return 0;
    }

    println!("{}", Table::new(rows));
    info!("Add one with: plarchive config add <playlist_id>");
    0
}

pub fn owned_playlist_rows(
    collections: &[OwnedCollection],
    user_id: &str,
    builder: &ConfigBuilder,
) -> Vec<OwnedPlaylistTableRow> {
    collections
        .iter()
        .filter(|c| c.owner_id == user_id)
        .filter(|c| !c.name.ends_with(utils::ARCHIVE_SUFFIX))
        .map(|c| OwnedPlaylistTableRow {
            playlist_id: c.id.clone(),
            name: c.name.clone(),
            tracks: c.item_count,
            public: c.is_public,
            configured: builder.contains(&c.id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(id: &str, name: &str, owner: &str) -> OwnedCollection {
        OwnedCollection {
            id: id.to_string(),
            name: name.to_string(),
            owner_id: owner.to_string(),
            item_count: 12,
            is_public: true,
        }
    }

    #[test]
    fn remote_rows_keep_own_non_archive_playlists() {
        let listing = vec![
            collection("3cEYpjA9oz9GiPac4AsH4n", "Road Trip", "me"),
            collection("1h0CEZCm6IbFTbxThn6Xcs", "Road Trip (Cumulative)", "me"),
            collection("37i9dQZF1DXcBWIGoYBM5M", "Today's Top Hits", "spotify"),
            collection("5pcoHNq6SGnHmMdFbKxBkG", "Gym", "me"),
        ];
        let builder = ConfigBuilder::new()
            .add("5pcoHNq6SGnHmMdFbKxBkG", None)
            .unwrap();

        let rows = owned_playlist_rows(&listing, "me", &builder);

        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Road Trip", "Gym"]);
        assert!(!rows[0].configured);
        assert!(rows[1].configured);
        assert_eq!(rows[1].tracks, 12);
    }
}
