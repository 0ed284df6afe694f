//! Generates Swift and Kotlin bindings for `stickerkit-core` built with the `ffi` feature.
//!
//! ```bash
//! cargo build -p stickerkit-core --features ffi --release
//! cargo run -p uniffi-bindgen -- generate --library target/release/libstickerkit_core.so \
//!     --language swift --out-dir bindings/swift
//! ```

fn main() {
    uniffi::uniffi_bindgen_main();
}
