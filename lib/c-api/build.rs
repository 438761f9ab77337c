use cbindgen::{Builder, Language};
use std::{env, path::PathBuf};

const PRE_HEADER: &str = r#"// The libhdfs++ C header file.

#include <stdint.h>
"#;

const TRAILER: &str = r#"
typedef struct hdfs_internal *hdfsFS;
typedef struct hdfsFile_internal *hdfsFile;
"#;

const SIMULATE_ERRORS_FEATURE_AS_C_DEFINE: &str = "LIBHDFSPP_SIMULATE_ERRORS";

fn main() {
    println!("cargo:rerun-if-changed=src");

    let crate_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is set by cargo");
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");

    build_hdfspp_header(&crate_dir, &out_dir);
}

fn build_hdfspp_header(crate_dir: &str, out_dir: &str) {
    let mut out_header_file = PathBuf::from(out_dir);
    out_header_file.push("hdfspp");
    out_header_file.set_extension("h");

    let generated = Builder::new()
        .with_language(Language::C)
        .with_crate(crate_dir)
        .with_include_guard("LIBHDFSPP_HDFS_H")
        .with_header(PRE_HEADER)
        .with_trailer(TRAILER)
        .with_sys_include("stddef.h")
        .with_define("feature", "simulate-errors", SIMULATE_ERRORS_FEATURE_AS_C_DEFINE)
        .with_documentation(true)
        .generate();

    // Generation failures only warn.
    match generated {
        Ok(bindings) => {
            bindings.write_to_file(&out_header_file);
        }
        Err(e) => println!("cargo:warning=Unable to generate the C header: {e}"),
    }
}
