fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use wakemate_protocol::{Command, CommandRequest, DeviceTarget, StatusResponse};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values.
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));
        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  server: {fixture}\n  client: {reserialized}"
        );
        parsed
    }

    fn target() -> DeviceTarget {
        DeviceTarget {
            device_id: "pc-1".into(),
            ip: "192.168.1.20".into(),
        }
    }

    // --- Status endpoint ---

    #[test]
    fn fixture_status_online() {
        let status: StatusResponse = roundtrip_test("status_online.json");
        assert!(status.is_online());
        assert!(status.extra.is_empty());
    }

    #[test]
    fn fixture_status_keeps_extra_fields() {
        let status: StatusResponse = roundtrip_test("status_success_extra.json");
        assert!(status.is_online());
        assert_eq!(status.extra["hostname"], "living-room-pc");
        assert_eq!(status.extra["uptime"], 86400);
    }

    #[test]
    fn fixture_status_pending_is_not_online() {
        let status: StatusResponse = roundtrip_test("status_pending.json");
        assert!(!status.is_online());
    }

    // --- Command endpoint ---

    #[test]
    fn fixture_command_get_status() {
        let req: CommandRequest = roundtrip_test("command_get_status.json");
        let built = Command::GetStatus.to_request(None).unwrap();
        assert_eq!(built, req);
    }

    #[test]
    fn fixture_command_mouse_move() {
        let req: CommandRequest = roundtrip_test("command_mouse_move.json");
        let built = Command::MouseMove { dx: -12, dy: 7 }
            .to_request(Some(&target()))
            .unwrap();
        assert_eq!(built, req);
    }

    #[test]
    fn fixture_command_wake() {
        let req: CommandRequest = roundtrip_test("command_wake.json");
        let built = Command::Wake {
            mac: "AA:BB:CC:DD:EE:FF".into(),
        }
        .to_request(Some(&target()))
        .unwrap();
        assert_eq!(built, req);
    }

    #[test]
    fn command_without_params_field_parses() {
        let req: CommandRequest = serde_json::from_str(r#"{"command":"volume_up"}"#).unwrap();
        assert_eq!(req.command, "volume_up");
        assert!(req.params.is_empty());
    }
}
