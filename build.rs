use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    // Copy input scripts and config to target directory
    copy_input_scripts();
    copy_config();
}

/// Returns target/release (or target/debug) from OUT_DIR.
fn target_dir() -> Option<PathBuf> {
    let out_dir = env::var("OUT_DIR").ok()?;
    // OUT_DIR is something like target/release/build/kingdom-scanner-xxx/out
    Path::new(&out_dir).ancestors().nth(3).map(Path::to_path_buf)
}

/// Copies the input-event scripts so the executable can replay them.
fn copy_input_scripts() {
    let Some(target_dir) = target_dir() else {
        return;
    };

    let inputs_src = Path::new("resources/inputs");
    let inputs_dst = target_dir.join("resources").join("inputs");

    if inputs_src.exists() {
        copy_dir_recursive(inputs_src, &inputs_dst);
        println!("cargo:rerun-if-changed=resources/inputs/");
    }
}

/// Recursively copies a directory and its contents.
fn copy_dir_recursive(src: &Path, dst: &Path) {
    let _ = fs::create_dir_all(dst);

    if let Ok(entries) = fs::read_dir(src) {
        for entry in entries.flatten() {
            let src_path = entry.path();
            let Some(file_name) = src_path.file_name() else {
                continue;
            };
            let dst_path = dst.join(file_name);

            if src_path.is_dir() {
                copy_dir_recursive(&src_path, &dst_path);
            } else {
                let _ = fs::copy(&src_path, &dst_path);
            }
        }
    }
}

/// Copies config.json to the target directory.
fn copy_config() {
    let Some(target_dir) = target_dir() else {
        return;
    };

    let config_src = Path::new("config.json");
    if config_src.exists() {
        let _ = fs::copy(config_src, target_dir.join("config.json"));
        println!("cargo:rerun-if-changed=config.json");
    }
}
