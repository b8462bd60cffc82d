//! Test support shared with downstream crates through the `tests` feature
