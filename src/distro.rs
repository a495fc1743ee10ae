//! Host distribution detection.
//!
//! Detection runs once per session and the result is immutable; it only
//! selects the dependency-installation branch. An absent or unreadable
//! `/etc/os-release` is a valid result (`Family::Unknown`), not an error —
//! the installer decides what to do with it.
use std::fmt;
use std::fs;

const OS_RELEASE: &str = "/etc/os-release";

/// Closed set of distribution families the installer knows about.
///
/// Kept exhaustive on purpose: adding a family forces every match site to
/// take a position instead of falling through a default arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Ubuntu,
    Debian,
    Centos,
    Rhel,
    Rocky,
    Almalinux,
    Fedora,
    Unknown,
}

impl Family {
    fn from_id(id: &str) -> Family {
        match id {
            "ubuntu" => Family::Ubuntu,
            "debian" => Family::Debian,
            "centos" => Family::Centos,
            "rhel" => Family::Rhel,
            "rocky" => Family::Rocky,
            "almalinux" => Family::Almalinux,
            "fedora" => Family::Fedora,
            _ => Family::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Ubuntu => "ubuntu",
            Family::Debian => "debian",
            Family::Centos => "centos",
            Family::Rhel => "rhel",
            Family::Rocky => "rocky",
            Family::Almalinux => "almalinux",
            Family::Fedora => "fedora",
            Family::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable host descriptor derived from `/etc/os-release`.
#[derive(Debug, Clone)]
pub struct Distro {
    pub family: Family,
    pub version: String,
    pub codename: String,
}

impl Distro {
    /// Detect the host distribution. Never fails; a host without release
    /// metadata yields `Family::Unknown` with empty fields.
    pub fn detect() -> Distro {
        match fs::read_to_string(OS_RELEASE) {
            Ok(content) => Distro::from_os_release(&content),
            Err(_) => Distro {
                family: Family::Unknown,
                version: String::new(),
                codename: String::new(),
            },
        }
    }

    /// Parse os-release text. Split out from `detect` so it can be tested
    /// against captured fixtures.
    pub fn from_os_release(content: &str) -> Distro {
        let mut id = String::new();
        let mut version = String::new();
        let mut codename = String::new();
        for line in content.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = crate::envfile::unquote(value.trim());
            match key.trim() {
                "ID" => id = value.to_ascii_lowercase(),
                "VERSION_ID" => version = value.to_string(),
                "VERSION_CODENAME" => codename = value.to_string(),
                _ => {}
            }
        }
        Distro {
            family: Family::from_id(&id),
            version,
            codename,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ubuntu() {
        let distro = Distro::from_os_release(
            "NAME=\"Ubuntu\"\nID=ubuntu\nVERSION_ID=\"24.04\"\nVERSION_CODENAME=noble\n",
        );
        assert_eq!(distro.family, Family::Ubuntu);
        assert_eq!(distro.version, "24.04");
        assert_eq!(distro.codename, "noble");
    }

    #[test]
    fn parses_rocky_without_codename() {
        let distro =
            Distro::from_os_release("ID=\"rocky\"\nVERSION_ID=\"9.3\"\nPRETTY_NAME=\"Rocky\"\n");
        assert_eq!(distro.family, Family::Rocky);
        assert_eq!(distro.version, "9.3");
        assert_eq!(distro.codename, "");
    }

    #[test]
    fn empty_metadata_is_unknown() {
        let distro = Distro::from_os_release("");
        assert_eq!(distro.family, Family::Unknown);
        assert!(distro.version.is_empty());
        assert!(distro.codename.is_empty());
    }

    #[test]
    fn unrecognized_id_is_unknown() {
        let distro = Distro::from_os_release("ID=gentoo\nVERSION_ID=2.15\n");
        assert_eq!(distro.family, Family::Unknown);
        // Version still carried through for the error message.
        assert_eq!(distro.version, "2.15");
    }
}
