use chrono::{TimeZone, Utc};
use plarchive::utils::*;

const PLAYLIST_ID: &str = "3cEYpjA9oz9GiPac4AsH4n";

#[test]
fn test_generate_code_verifier() {
    let verifier = generate_code_verifier();

    // Should be exactly 128 characters
    assert_eq!(verifier.len(), 128);

    // Should contain only alphanumeric characters
    assert!(verifier.chars().all(|c| c.is_ascii_alphanumeric()));

    // Two generated verifiers should be different
    let verifier2 = generate_code_verifier();
    assert_ne!(verifier, verifier2);
}

#[test]
fn test_generate_code_challenge() {
    let verifier = "test_verifier_123";
    let challenge = generate_code_challenge(verifier);

    // Should be deterministic
    assert_eq!(challenge, generate_code_challenge(verifier));
    assert_ne!(challenge, generate_code_challenge("different_verifier"));

    // SHA256 digest, base64url without padding
    assert_eq!(challenge.len(), 43);
    assert!(!challenge.contains('='));
    assert!(!challenge.contains('+'));
    assert!(!challenge.contains('/'));
}

#[test]
fn test_archive_name_uses_source_name() {
    assert_eq!(archive_name("Discover Weekly", None), "Discover Weekly (Cumulative)");
}

#[test]
fn test_archive_name_prefers_custom_name() {
    assert_eq!(
        archive_name("Discover Weekly", Some("My Discoveries")),
        "My Discoveries (Cumulative)"
    );

    // Blank custom names fall back to the source name
    assert_eq!(archive_name("Mix", Some("   ")), "Mix (Cumulative)");
}

#[test]
fn test_archive_description() {
    let now = Utc.with_ymd_and_hms(2025, 3, 7, 9, 5, 0).unwrap();
    assert_eq!(
        archive_description("Release Radar", PLAYLIST_ID, now),
        format!(
            "Cumulative archive of 'Release Radar' (last updated: 2025-03-07 at 09:05 UTC). \
             Original playlist: spotify:playlist:{PLAYLIST_ID}"
        )
    );
}

#[test]
fn test_is_algorithmic_playlist() {
    assert!(is_algorithmic_playlist("37i9dQZF1DXcBWIGoYBM5M"));
    assert!(is_algorithmic_playlist("37i9dQZEVXcJZyENOWUFo7"));
    assert!(!is_algorithmic_playlist(PLAYLIST_ID));
    assert!(!is_algorithmic_playlist(""));
}

#[test]
fn test_extract_playlist_id_from_raw_id() {
    assert_eq!(extract_playlist_id(PLAYLIST_ID).as_deref(), Some(PLAYLIST_ID));
    assert_eq!(
        extract_playlist_id(&format!("  {PLAYLIST_ID}\n")).as_deref(),
        Some(PLAYLIST_ID)
    );
}

#[test]
fn test_extract_playlist_id_from_url() {
    let url = format!("https://open.spotify.com/playlist/{PLAYLIST_ID}?si=a1b2c3d4e5");
    assert_eq!(extract_playlist_id(&url).as_deref(), Some(PLAYLIST_ID));

    let localized = format!("https://open.spotify.com/intl-de/playlist/{PLAYLIST_ID}");
    assert_eq!(extract_playlist_id(&localized).as_deref(), Some(PLAYLIST_ID));
}

#[test]
fn test_extract_playlist_id_from_uri() {
    let uri = format!("spotify:playlist:{PLAYLIST_ID}");
    assert_eq!(extract_playlist_id(&uri).as_deref(), Some(PLAYLIST_ID));
}

#[test]
fn test_extract_playlist_id_rejects_invalid_input() {
    assert_eq!(extract_playlist_id(""), None);
    assert_eq!(extract_playlist_id("not-a-playlist"), None);
    assert_eq!(extract_playlist_id("spotify:track:4uLU6hMCjMI75M1A2tKUQC"), None);
    assert_eq!(extract_playlist_id("https://open.spotify.com/playlist/short"), None);
}

#[test]
fn test_dedup_preserving_order() {
    let uris = ["c", "a", "c", "b", "a"].map(String::from);
    assert_eq!(dedup_preserving_order(uris), vec!["c", "a", "b"]);
}

#[test]
fn test_dedup_preserving_order_empty() {
    assert!(dedup_preserving_order(Vec::<String>::new()).is_empty());
}
