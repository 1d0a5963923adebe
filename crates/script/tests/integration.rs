//! Integration tests for script parsing

use std::io::Write;
use triage_script::{defaults, Action, KubeGetWhat, Machine, Script};

#[test]
fn full_script_assembles_preambles_and_actions() {
    let key = tempfile::NamedTempFile::new().expect("temp key");
    writeln!(key.as_file(), "dummy key material").expect("write key");

    let text = format!(
        r#"
# collect basics from two nodes
FROM local 10.0.0.5:2222
WORKDIR /tmp/diag
AS userid:ops groupid:ops
AUTHCONFIG username:admin private-key:{key}
ENV CLUSTER=prod REGION=eu-1
OUTPUT /tmp/diag.tar.gz
KUBECONFIG /etc/kubernetes/admin.conf

CAPTURE /bin/uname -a
COPY /var/log/syslog
RUN cmd:"/bin/hostname -f" echo:true
KUBEGET all namespaces:kube-system
"#,
        key = key.path().display()
    );

    let script = Script::parse(&text).expect("parse");

    assert_eq!(script.from.machines, vec![
        Machine::Local,
        Machine::Remote {
            host: "10.0.0.5".to_string(),
            port: 2222
        }
    ]);
    assert_eq!(script.workdir.path.to_str(), Some("/tmp/diag"));
    assert_eq!(script.as_user.userid.as_deref(), Some("ops"));
    assert_eq!(script.auth.username.as_deref(), Some("admin"));
    assert_eq!(script.output.path.to_str(), Some("/tmp/diag.tar.gz"));
    assert_eq!(
        script
            .kube_config
            .as_ref()
            .and_then(|k| k.path.to_str()),
        Some("/etc/kubernetes/admin.conf")
    );
    assert_eq!(script.env.len(), 1);
    assert_eq!(script.env[0].vars.len(), 2);

    assert_eq!(script.actions.len(), 4);
    assert_eq!(script.actions[0].kind(), "CAPTURE");
    assert_eq!(script.actions[1].kind(), "COPY");
    assert_eq!(script.actions[2].kind(), "RUN");
    assert_eq!(script.actions[3].kind(), "KUBEGET");
    match &script.actions[3] {
        Action::KubeGet(kube) => {
            assert_eq!(kube.what, KubeGetWhat::All);
            assert_eq!(kube.namespaces, vec!["kube-system"]);
        }
        other => panic!("unexpected action: {other:?}"),
    }

    assert!(script.has_remote_machines());
}

#[test]
fn sshconfig_is_an_alias_for_authconfig() {
    let key = tempfile::NamedTempFile::new().expect("temp key");
    let text = format!(
        "FROM 192.168.1.10\nSSHCONFIG username:root private-key:{}\nCAPTURE /bin/date\n",
        key.path().display()
    );
    let script = Script::parse(&text).expect("parse");
    assert_eq!(script.auth.username.as_deref(), Some("root"));
}

#[test]
fn line_numbers_survive_into_parsed_commands() {
    let text = "\n\nFROM local\n\nCAPTURE /bin/date\n";
    let script = Script::parse(text).expect("parse");
    assert_eq!(script.from.line, 3);
    assert_eq!(script.actions[0].line(), 5);
}

#[test]
fn default_script_targets_local_only() {
    let script = Script::parse("CAPTURE /bin/date\n").expect("parse");
    assert!(!script.has_remote_machines());
    assert_eq!(script.from.machines[0].address(), defaults::LOCAL_ADDRESS);
}
