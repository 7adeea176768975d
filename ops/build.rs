use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use naga::valid::{Capabilities, ValidationFlags, Validator};

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR not set"));
    let shader_dir = Path::new("shaders");

    let entries = fs::read_dir(shader_dir).expect("Unable to read shaders directory");
    for entry in entries {
        let path = entry.expect("Unable to read shader entry").path();
        if path.extension().and_then(|e| e.to_str()) != Some("wgsl") {
            continue;
        }

        // Parse + validate the WGSL source
        let source = fs::read_to_string(&path)
            .expect("Unable to read shader source");
        let module = naga::front::wgsl::parse_str(&source)
            .unwrap_or_else(|e| panic!("{}", e.emit_to_string(&source)));
        let info = Validator::new(ValidationFlags::all(), Capabilities::default())
            .validate(&module)
            .unwrap_or_else(|e| panic!("{}: invalid shader: {:?}", path.display(), e));

        // Emit SPIR-V next to the other build outputs
        let words = naga::back::spv::write_vec(&module, &info, &naga::back::spv::Options::default(), None)
            .expect("Failed to emit SPIR-V");
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .expect("Shader file name is not UTF-8");
        fs::write(out_dir.join(format!("{stem}.comp.spv")), bytemuck::cast_slice::<u32, u8>(&words))
            .expect("Unable to write SPIR-V");

        println!("cargo:rerun-if-changed={}", path.display());
    }

    // Tell cargo to rerun when shaders are added or removed
    println!("cargo:rerun-if-changed=shaders");
}
