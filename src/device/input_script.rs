//! Recorded touch input, replayed with `sendevent`.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;

/// One `sendevent` line: event type, code, value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: u32,
    pub code: u32,
    pub value: u32,
}

/// Parses a script: one event of three unsigned integers per line.
/// Blank lines are ignored.
pub fn parse_script(text: &str) -> Result<Vec<InputEvent>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            let fields: Vec<u32> = line
                .split_whitespace()
                .map(str::parse)
                .collect::<std::result::Result<_, _>>()
                .with_context(|| format!("line {}: not a number in {:?}", idx + 1, line))?;
            match fields.as_slice() {
                [kind, code, value] => Ok(InputEvent {
                    kind: *kind,
                    code: *code,
                    value: *value,
                }),
                _ => Err(anyhow!(
                    "line {}: expected 3 fields, got {}",
                    idx + 1,
                    fields.len()
                )),
            }
        })
        .collect()
}

pub fn load_script(path: &Path) -> Result<Vec<InputEvent>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input script {}", path.display()))?;
    parse_script(&text).with_context(|| format!("Invalid input script {}", path.display()))
}

/// Builds one shell command that replays all events in order.
pub fn sendevent_command(device: &str, events: &[InputEvent]) -> String {
    events
        .iter()
        .map(|e| format!("sendevent {} {} {} {}", device, e.kind, e.code, e.value))
        .collect::<Vec<_>>()
        .join(";")
}

/// Finds the input device whose `getevent -pl` block mentions `marker`.
///
/// `getevent -pl` lists each device as an `add device N: /dev/input/eventX`
/// line followed by its capabilities.
pub fn find_input_device(getevent_output: &str, marker: &str) -> Option<String> {
    let mut current: Option<&str> = None;
    for line in getevent_output.lines() {
        if let Some(rest) = line.strip_prefix("add device") {
            current = rest.split_once(':').map(|(_, path)| path.trim());
        } else if line.contains(marker) {
            if let Some(path) = current {
                return Some(path.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const GETEVENT: &str = concat!(
        "add device 1: /dev/input/event3\n",
        "  name:     \"bst_keyboard\"\n",
        "  events:\n",
        "    KEY (0001): KEY_ESC\n",
        "add device 2: /dev/input/event2\n",
        "  name:     \"BlueStacks Virtual Touch\"\n",
        "  events:\n",
        "    ABS (0003): ABS_MT_POSITION_X : value 0, min 0, max 32767\n",
        "                ABS_MT_POSITION_Y : value 0, min 0, max 32767\n",
    );

    #[test]
    fn test_parse_script() {
        let events = parse_script("3 57 0\n1 330 1\n\n3 53 21500\n0 0 0\n").unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(
            events[2],
            InputEvent {
                kind: 3,
                code: 53,
                value: 21500
            }
        );
    }

    #[test]
    fn test_parse_script_rejects_bad_lines() {
        assert!(parse_script("3 57\n").is_err());
        assert!(parse_script("3 57 x\n").is_err());
        assert!(parse_script("3 57 -1\n").is_err());
    }

    #[test]
    fn test_sendevent_command() {
        let events = parse_script("3 57 0\n0 0 0").unwrap();
        assert_eq!(
            sendevent_command("/dev/input/event2", &events),
            "sendevent /dev/input/event2 3 57 0;sendevent /dev/input/event2 0 0 0"
        );
    }

    #[test]
    fn test_find_input_device() {
        assert_eq!(
            find_input_device(GETEVENT, "Touch").as_deref(),
            Some("/dev/input/event2")
        );
        assert_eq!(
            find_input_device(GETEVENT, "ABS_MT_POSITION_Y").as_deref(),
            Some("/dev/input/event2")
        );
        assert_eq!(find_input_device(GETEVENT, "Gamepad"), None);
    }

    #[test]
    fn test_bundled_scripts_parse() {
        let inputs = Path::new(env!("CARGO_MANIFEST_DIR")).join("resources").join("inputs");
        for emulator in ["bluestacks", "ld"] {
            for name in [
                "kingdom_1_person_scroll.txt",
                "alliance_6_per_screen.txt",
                "honor_5_per_screen.txt",
                "seed_6_per_screen.txt",
            ] {
                let events = load_script(&inputs.join(emulator).join(name)).unwrap();
                assert!(!events.is_empty(), "{}/{} is empty", emulator, name);
            }
        }
    }
}
