use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("managed path is empty")]
    Empty,
    #[error("managed path contains unsupported component: {0}")]
    UnsupportedComponent(String),
}

/// `root/<item>`; the item name must be a single plain component.
pub fn item_dir(root: &Path, item: &str) -> Result<PathBuf, PathError> {
    let mut components = Path::new(item).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) => Ok(root.join(part)),
        (None, _) => Err(PathError::Empty),
        _ => Err(PathError::UnsupportedComponent(item.to_string())),
    }
}

/// `root/<item>/<relative>`, refusing anything that could climb out of the
/// item directory.
pub fn item_file(root: &Path, item: &str, relative: &str) -> Result<PathBuf, PathError> {
    let mut out = item_dir(root, item)?;
    let mut pushed = false;
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => {
                out.push(part);
                pushed = true;
            }
            Component::CurDir => continue,
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(PathError::UnsupportedComponent(relative.to_string()));
            }
        }
    }
    if !pushed {
        return Err(PathError::Empty);
    }
    Ok(out)
}

/// True when `path` is strictly below `root` and has no `..` component.
pub fn is_within(root: &Path, path: &Path) -> bool {
    match path.strip_prefix(root) {
        Ok(rest) => {
            rest.components().next().is_some()
                && rest
                    .components()
                    .all(|component| matches!(component, Component::Normal(_)))
        }
        Err(_) => false,
    }
}
