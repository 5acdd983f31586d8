//! ADB port lookup in `bluestacks.conf`.

use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const DISPLAY_NAME: &str = "display_name";
const ADB_PORT: &str = "status.adb_port";

/// Parses `key="value"` lines.
fn parse_conf(text: &str) -> HashMap<String, String> {
    let Ok(line_re) = Regex::new(r#"^\s*([\w.\-]+)\s*=\s*"(.*)"\s*$"#) else {
        return HashMap::new();
    };
    text.lines()
        .filter_map(|line| line_re.captures(line))
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

/// Port of the instance whose display name is `instance`.
pub fn bluestacks_port(conf: &str, instance: &str) -> Option<u16> {
    let entries = parse_conf(conf);
    let prefix = entries.iter().find_map(|(key, value)| {
        (value == instance)
            .then(|| key.strip_suffix(DISPLAY_NAME))
            .flatten()
    })?;
    entries
        .get(&format!("{}{}", prefix, ADB_PORT))?
        .trim()
        .parse()
        .ok()
}

/// Reads the port from a config file, logging why when it cannot.
pub fn discover_port(conf_path: &Path, instance: &str) -> Option<u16> {
    let text = match fs::read_to_string(conf_path) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("Cannot read {}: {}", conf_path.display(), e);
            return None;
        }
    };
    let port = bluestacks_port(&text, instance);
    match port {
        Some(port) => log::info!("BlueStacks instance '{}' uses ADB port {}", instance, port),
        None => log::warn!(
            "No ADB port for instance '{}' in {}",
            instance,
            conf_path.display()
        ),
    }
    port
}
