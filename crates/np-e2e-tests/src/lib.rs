//! End-to-end tests for NetPilot live in `tests/`; this crate has no runtime code.
