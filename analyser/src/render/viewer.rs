use std::path::Path;
use std::process::Command;

#[cfg(target_os = "macos")]
const OPENERS: &[&str] = &["open"];
#[cfg(not(target_os = "macos"))]
const OPENERS: &[&str] = &["xdg-open", "open"];

/// Open a file with the desktop's default viewer.
///
/// The viewer runs detached. Failing to find one is not an error, the file has already been
/// written and its location is logged.
pub fn open_in_viewer(path: &Path) {
    if spawn_viewer(OPENERS, path).is_none() {
        log::warn!(
            "Could not open a viewer, the output is at {}",
            path.display()
        );
    }
}

/// Start the first opener that can be spawned, returning its name.
fn spawn_viewer<'a>(openers: &[&'a str], path: &Path) -> Option<&'a str> {
    for &opener in openers {
        match Command::new(opener).arg(path).spawn() {
            Ok(child) => {
                log::info!(
                    "Opened {} with {opener} (PID {})",
                    path.display(),
                    child.id()
                );
                return Some(opener);
            }
            Err(e) => log::debug!("{opener} unavailable: {e}"),
        }
    }

    None
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn first_available_opener_is_used() {
        let used = spawn_viewer(&["/does/not/exist/opener", "true"], Path::new("viz.html"));
        assert_eq!(used, Some("true"));
    }

    #[test]
    fn no_available_opener() {
        let used = spawn_viewer(&["/does/not/exist/opener"], Path::new("viz.html"));
        assert_eq!(used, None);
    }
}
