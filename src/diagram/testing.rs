use super::RenderError;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const ETXTBSY: i32 = 26;

/// Writes an executable stand-in for `dot` that copies its stdin to the
/// path given after `-o`.
pub(crate) fn stub_dot(dir: &Path) -> PathBuf {
    let path = dir.join("stub-dot");
    fs::write(
        &path,
        "#!/bin/sh\nwhile [ \"$#\" -gt 0 ] && [ \"$1\" != \"-o\" ]; do shift; done\ncat > \"$2\"\n",
    )
    .unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Retries while the freshly written stub is still held open by a sibling
/// test's fork.
pub(crate) fn retry_busy<T>(
    mut render: impl FnMut() -> Result<T, RenderError>,
) -> Result<T, RenderError> {
    for _ in 0..20 {
        match render() {
            Err(RenderError::RendererUnavailable { source, .. })
                if source.raw_os_error() == Some(ETXTBSY) =>
            {
                std::thread::sleep(std::time::Duration::from_millis(50));
            }
            other => return other,
        }
    }
    render()
}
