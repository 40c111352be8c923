// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Build script for qcom-smp.

use std::env;

const PLATFORMS: [&str; 1] = ["msm8916"];

fn main() {
    println!(
        "cargo::rustc-check-cfg=cfg(platform, values(\"{}\"))",
        PLATFORMS.join("\", \""),
    );
    println!("cargo:rerun-if-env-changed=LOG_LEVEL");

    if let Ok(platform) = env::var("CARGO_CFG_PLATFORM") {
        assert!(
            PLATFORMS.contains(&platform.as_str()),
            "Unknown platform {platform}"
        );
        assert_eq!(
            env::var("CARGO_CFG_TARGET_ARCH").as_deref(),
            Ok("aarch64"),
            "Platform {platform} is only supported on aarch64"
        );
    }
}
