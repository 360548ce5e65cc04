//! Fixtures shared by unit and integration tests.
//!
//! Test programs are synthesized as `/bin/sh` scripts inside a temporary
//! suite root so tests exercise real process spawning.

use std::fs;
use std::path::{Path, PathBuf};

/// Write an executable `/bin/sh` script at `root/relative` and return its path.
///
/// `body` is everything after the shebang line.
#[cfg(unix)]
pub fn write_script(root: &Path, relative: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create script parent");
    }
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    let mut perms = fs::metadata(&path).expect("stat script").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod script");
    path
}

/// Write a plain (non-executable) file, creating parents as needed.
pub fn write_file(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create file parent");
    }
    fs::write(&path, contents).expect("write file");
    path
}

/// Shell body for an ATF-style program exposing the given cases.
///
/// Each case is `(name, properties, body)`; `properties` are extra
/// `key: value` lines for the listing and `body` runs with `$resfile` set to
/// the result file requested through `-r`.
pub fn atf_program_body(cases: &[(&str, &[&str], &str)]) -> String {
    let mut listing = String::from(
        "echo 'Content-Type: application/X-atf-tp; version=\"1\"'\necho\n",
    );
    let mut dispatch = String::new();
    let mut listed = 0;
    for (name, properties, body) in cases {
        dispatch.push_str(&format!("    {name}) {body} ;;\n"));
        // `case:cleanup` entries are dispatch-only.
        if name.contains(':') {
            continue;
        }
        if listed > 0 {
            listing.push_str("echo\n");
        }
        listed += 1;
        listing.push_str(&format!("echo 'ident: {name}'\n"));
        for property in properties.iter() {
            listing.push_str(&format!("echo '{property}'\n"));
        }
    }

    format!(
        r#"resfile=""
while [ $# -gt 0 ]; do
    case "$1" in
        -l)
{listing}            exit 0 ;;
        -r*) resfile="${{1#-r}}"; shift ;;
        -v) shift 2 ;;
        *) break ;;
    esac
done
case "$1" in
{dispatch}    *) echo "unknown test case $1" >&2; exit 3 ;;
esac"#
    )
}
