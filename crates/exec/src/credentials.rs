//! Credential resolution from AS and AUTHCONFIG preambles
//!
//! AUTHCONFIG's username wins for SSH login. AS contributes uid/gid for
//! local execution only; a symbolic AS userid doubles as the SSH
//! fallback login when AUTHCONFIG carries none. Failures here abort the
//! run before any machine is touched.

use nix::unistd::{Group, Uid, User};
use std::path::PathBuf;
use triage_errors::{CredentialError, Error};
use triage_script::Script;

/// Resolved identities for one run
#[derive(Debug, Clone)]
pub struct Credentials {
    /// SSH login name
    pub username: String,
    /// Private key for SSH authentication
    pub private_key: Option<PathBuf>,
    /// Local uid override from AS
    pub uid: Option<u32>,
    /// Local gid override from AS
    pub gid: Option<u32>,
}

/// Resolve effective credentials for a script.
///
/// # Errors
///
/// Returns a [`CredentialError`] when a remote machine is targeted
/// without a private key, the key is unreadable, or an AS identity does
/// not exist in the OS user database.
pub fn resolve(script: &Script) -> Result<Credentials, Error> {
    let username = match &script.auth.username {
        Some(name) => name.clone(),
        None => match symbolic_userid(script) {
            Some(name) => name.clone(),
            None => current_username()?,
        },
    };

    let private_key = match &script.auth.private_key {
        Some(path) => {
            std::fs::metadata(path).map_err(|e| CredentialError::UnreadableKey {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            Some(path.clone())
        }
        None => None,
    };

    if private_key.is_none() {
        if let Some(remote) = script.from.machines.iter().find(|m| !m.is_local()) {
            return Err(CredentialError::MissingPrivateKey {
                machine: remote.address(),
            }
            .into());
        }
    }

    // uid/gid only matter when something runs locally
    let (uid, gid) = if script.from.machines.iter().any(triage_script::Machine::is_local) {
        (
            resolve_uid(script.as_user.userid.as_deref())?,
            resolve_gid(script.as_user.groupid.as_deref())?,
        )
    } else {
        (None, None)
    };

    Ok(Credentials {
        username,
        private_key,
        uid,
        gid,
    })
}

fn symbolic_userid(script: &Script) -> Option<&String> {
    script
        .as_user
        .userid
        .as_ref()
        .filter(|id| id.parse::<u32>().is_err())
}

fn current_username() -> Result<String, Error> {
    let user = User::from_uid(Uid::effective())
        .map_err(|e| Error::internal(format!("user lookup: {e}")))?
        .ok_or(CredentialError::NoCurrentUser)?;
    Ok(user.name)
}

fn resolve_uid(userid: Option<&str>) -> Result<Option<u32>, Error> {
    let Some(userid) = userid else {
        return Ok(None);
    };
    if let Ok(numeric) = userid.parse::<u32>() {
        return Ok(Some(numeric));
    }
    let user = User::from_name(userid)
        .map_err(|e| Error::internal(format!("user lookup: {e}")))?
        .ok_or_else(|| CredentialError::UnknownIdentity {
            identity: userid.to_string(),
        })?;
    Ok(Some(user.uid.as_raw()))
}

fn resolve_gid(groupid: Option<&str>) -> Result<Option<u32>, Error> {
    let Some(groupid) = groupid else {
        return Ok(None);
    };
    if let Ok(numeric) = groupid.parse::<u32>() {
        return Ok(Some(numeric));
    }
    let group = Group::from_name(groupid)
        .map_err(|e| Error::internal(format!("group lookup: {e}")))?
        .ok_or_else(|| CredentialError::UnknownIdentity {
            identity: groupid.to_string(),
        })?;
    Ok(Some(group.gid.as_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use triage_errors::Error;

    #[test]
    fn local_only_scripts_need_no_key() {
        let script = Script::parse("FROM local\nCAPTURE /bin/date\n").expect("parse");
        let credentials = resolve(&script).expect("resolve");
        assert!(credentials.private_key.is_none());
        assert!(!credentials.username.is_empty());
    }

    #[test]
    fn remote_machines_without_a_key_are_fatal() {
        let script = Script::parse("FROM 10.0.0.5\nCAPTURE /bin/date\n").expect("parse");
        let err = resolve(&script).expect_err("missing key");
        assert!(matches!(
            err,
            Error::Credential(CredentialError::MissingPrivateKey { .. })
        ));
    }

    #[test]
    fn missing_key_file_is_a_credential_error() {
        let script = Script::parse(
            "FROM 10.0.0.5\nAUTHCONFIG username:ops private-key:/no/such/id_rsa\nCAPTURE /bin/date\n",
        )
        .expect("parse");
        let err = resolve(&script).expect_err("unreadable key");
        assert!(matches!(
            err,
            Error::Credential(CredentialError::UnreadableKey { .. })
        ));
    }

    #[test]
    fn authconfig_username_wins_over_as() {
        let key = tempfile::NamedTempFile::new().expect("key");
        writeln!(key.as_file(), "key material").expect("write");
        let text = format!(
            "FROM 10.0.0.5\nAS userid:fallback_user\nAUTHCONFIG username:admin private-key:{}\nCAPTURE /bin/date\n",
            key.path().display()
        );
        let script = Script::parse(&text).expect("parse");
        let credentials = resolve(&script).expect("resolve");
        assert_eq!(credentials.username, "admin");
        // No local machine in FROM, so the symbolic AS id is not resolved
        assert_eq!(credentials.uid, None);
    }

    #[test]
    fn symbolic_as_userid_is_the_ssh_fallback() {
        let key = tempfile::NamedTempFile::new().expect("key");
        let text = format!(
            "FROM 10.0.0.5\nAS userid:deploy\nAUTHCONFIG private-key:{}\nCAPTURE /bin/date\n",
            key.path().display()
        );
        let script = Script::parse(&text).expect("parse");
        let credentials = resolve(&script).expect("resolve");
        assert_eq!(credentials.username, "deploy");
    }

    #[test]
    fn numeric_as_ids_pass_through_for_local_exec() {
        let script =
            Script::parse("FROM local\nAS userid:0 groupid:0\nCAPTURE /bin/date\n").expect("parse");
        let credentials = resolve(&script).expect("resolve");
        assert_eq!(credentials.uid, Some(0));
        assert_eq!(credentials.gid, Some(0));
    }

    #[test]
    fn unknown_symbolic_identity_is_fatal_for_local_runs() {
        let script = Script::parse(
            "FROM local\nAS userid:no_such_user_zz9\nCAPTURE /bin/date\n",
        )
        .expect("parse");
        let err = resolve(&script).expect_err("unknown identity");
        assert!(matches!(
            err,
            Error::Credential(CredentialError::UnknownIdentity { .. })
        ));
    }
}
