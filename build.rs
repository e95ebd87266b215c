use std::env;
use std::fs;
use std::path::Path;

/// STM32H753VI: 2 MiB flash in bank 1/2, 512 KiB AXI SRAM
const MEMORY_X: &str = "MEMORY
{
    FLASH : ORIGIN = 0x08000000, LENGTH = 2M
    RAM   : ORIGIN = 0x24000000, LENGTH = 512K
}
";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Host builds (unit tests of the driver library) need no linker scripts
    if env::var_os("CARGO_FEATURE_FIRMWARE").is_none() {
        return;
    }

    let out_dir = env::var("OUT_DIR").unwrap();
    fs::write(Path::new(&out_dir).join("memory.x"), MEMORY_X).unwrap();
    println!("cargo:rustc-link-search={}", out_dir);

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}
