use std::collections::BTreeSet;

// Version metadata for `ulas --version`, without author details.
fn main() -> shadow_rs::SdResult<()> {
    shadow_rs::new_deny(BTreeSet::from(["COMMIT_EMAIL", "COMMIT_AUTHOR"]))
}
