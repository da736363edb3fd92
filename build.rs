fn main() {
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os == "espidf" {
        embuild::espidf::sysenv::output();
    }

    if std::env::var("CARGO_FEATURE_MAXIM_ALGORITHM").is_ok() {
        // On device, use the Embuild cross compiler; on the host the default C compiler is fine.
        let compiler = if target_os == "espidf" {
            Some(find_compiler().unwrap_or_else(|| "riscv32-esp-elf-gcc".into()))
        } else {
            None
        };
        build_spo2(compiler.as_deref());
    }
}

fn find_compiler() -> Option<std::path::PathBuf> {
    use std::path::PathBuf;
    // Check local .embuild first, then global ~/.espressif
    let search_dirs = vec![
        std::env::var("CARGO_MANIFEST_DIR")
            .map(|dir| PathBuf::from(dir).join(".embuild"))
            .unwrap_or_default(),
        dirs::home_dir().map(|h| h.join(".espressif")).unwrap_or_default(),
    ];

    for root in search_dirs {
        let tools_dir = root.join("espressif/tools/riscv32-esp-elf");
        if !tools_dir.exists() {
            continue;
        }
        // Versioned directory, e.g. esp-13.2.0_20240530
        let Ok(entries) = std::fs::read_dir(&tools_dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                let candidate = path.join("riscv32-esp-elf/bin/riscv32-esp-elf-gcc");
                if candidate.exists() {
                    return Some(candidate);
                }
            }
        }
    }
    None
}

/// Compile the vendor SpO2 / heart-rate algorithm (`spo2_algorithm.c`).
fn build_spo2(compiler_path: Option<&std::path::Path>) {
    use std::path::PathBuf;

    let src_root = PathBuf::from("spo2_algorithm");

    let mut build = cc::Build::new();
    if let Some(compiler) = compiler_path {
        build.compiler(compiler);
    }

    build
        .flag_if_supported("-std=c99")
        .flag_if_supported("-O2")
        .include(&src_root);

    add_source_files(&mut build, &src_root);

    build.compile("spo2-algorithm");

    println!("cargo:rerun-if-changed=spo2_algorithm");
}

fn add_source_files(build: &mut cc::Build, dir: &std::path::Path) {
    for entry in std::fs::read_dir(dir).expect("Failed to read directory") {
        let entry = entry.expect("Failed to read directory entry");
        let path = entry.path();

        if path.is_dir() {
            add_source_files(build, &path);
        } else if path.extension().is_some_and(|ext| ext == "c") {
            build.file(&path);
        }
    }
}
