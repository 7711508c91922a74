fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use filedock_protocol::messages::{
        ChunkUploadFields, ExistenceCheckRequest, MergeRequest, NameCheckQuery, SimpleUploadFields,
    };
    use filedock_protocol::{ApiResponse, MenuId};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Reads a fixture file as text.
    fn read_fixture(name: &str) -> String {
        let path = fixtures_dir().join(name);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        serde_json::from_str(&read_fixture(name))
            .unwrap_or_else(|e| panic!("failed to parse fixture {name}: {e}"))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent comparison).
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_str(&read_fixture(name))
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  wire: {fixture}\n  Rust: {reserialized}"
        );
        parsed
    }

    /// Loads a form fixture as `(name, value)` pairs.
    fn load_form(name: &str) -> Vec<(String, String)> {
        serde_json::from_value(load_fixture(name))
            .unwrap_or_else(|e| panic!("failed to parse form fixture {name}: {e}"))
    }

    fn owned(fields: Vec<(&'static str, String)>) -> Vec<(String, String)> {
        fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    // --- Requests ---

    #[test]
    fn fixture_existence_check_request() {
        let req = roundtrip_test::<ExistenceCheckRequest>("existence_check_request.json");
        let built = ExistenceCheckRequest::new(
            "9e107d9d372bb6826bd81d3542a419d6",
            "holiday.mp4",
            "mp4",
            262_144_000,
            Some(MenuId(42)),
        );
        assert_eq!(req, built);
    }

    #[test]
    fn fixture_merge_request_without_menu() {
        let req = roundtrip_test::<MergeRequest>("merge_request.json");
        assert_eq!(req.menu_id, None);
        assert_eq!(req.total_size, 262_144_000);
    }

    #[test]
    fn fixture_chunk_upload_form() {
        let digest = "9e107d9d372bb6826bd81d3542a419d6";
        let fields = ChunkUploadFields {
            identifier: digest.into(),
            chunk_identifier: ChunkUploadFields::chunk_identifier_for(digest, 12),
            chunk_name: "e4d909c290d0fb1ca068ffaddf22cbd0".into(),
            file_name: "holiday.mp4".into(),
            file_type: "mp4".into(),
            chunk_number: 12,
            current_chunk_size: 10_485_760,
            total_chunks: 13,
            total_size: 262_144_000,
            menu_id: Some(MenuId(42)),
        };
        assert_eq!(owned(fields.form_fields()), load_form("chunk_upload_form.json"));
    }

    #[test]
    fn fixture_simple_upload_form() {
        let fields = SimpleUploadFields {
            file_name: "notes.txt".into(),
            file_type: "txt".into(),
            menu_id: None,
            identifier: "d41d8cd98f00b204e9800998ecf8427e".into(),
        };
        assert_eq!(owned(fields.form_fields()), load_form("simple_upload_form.json"));
    }

    // --- Responses ---

    #[test]
    fn fixture_name_check_query() {
        let query = NameCheckQuery::new(None, "年度报告.pdf");
        assert_eq!(owned(query.query_pairs()), load_form("name_check_query.json"));
    }

    #[test]
    fn fixture_chunk_responses() {
        let accepted = roundtrip_test::<ApiResponse>("response_chunk_accepted.json");
        assert!(accepted.is_ok());
        assert!(!accepted.all_chunks_received());

        let complete = roundtrip_test::<ApiResponse>("response_chunk_complete.json");
        assert!(complete.all_chunks_received());
    }

    #[test]
    fn fixture_fast_upload_response() {
        let resp = roundtrip_test::<ApiResponse>("response_fast_upload.json");
        assert!(resp.is_fast_upload());
        assert!(!resp.is_ok());
        assert_eq!(resp.data_value()["id"], 981);
    }

    #[test]
    fn fixture_merged_response() {
        let resp = roundtrip_test::<ApiResponse>("response_merged.json");
        assert!(resp.is_ok());
        assert_eq!(resp.data_value()["url"], "/files/982");
    }

    #[test]
    fn fixture_error_response() {
        let resp = roundtrip_test::<ApiResponse>("response_error.json");
        assert_eq!(resp.code, 500);
        assert_eq!(resp.message, "chunk 3 missing");
        assert!(resp.data.is_none());
    }
}
