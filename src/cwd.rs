use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use path_absolutize::Absolutize;

use crate::Error;

/// Resolve a working directory override: expand a leading `~` to the home directory and make the
/// path absolute relative to the current directory.
pub fn resolve_cwd(path: &Path) -> crate::Result<PathBuf> {
    let expanded = expand_home(path);
    let absolute = expanded
        .absolutize()
        .map_err(|source| Error::Cwd {
            path: path.to_owned(),
            source,
        })?
        .into_owned();
    tracing::trace!(?path, ?absolute, "Resolved working directory");
    Ok(absolute)
}

/// Expand a leading `~` component to the current user's home directory.
///
/// `~user` forms are left alone, as are paths when the home directory is unknown.
fn expand_home(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => match dirs::home_dir() {
            Some(home) => home.join(components.as_path()),
            None => path.to_owned(),
        },
        _ => path.to_owned(),
    }
}
