//! Tests against the bundled Ubuntu fixture

use cloud_init_fixture::fixtures::{UBUNTU_USER_DATA, ubuntu};
use cloud_init_fixture::{ConfigDocument, LoadError, Section, load};
use pretty_assertions::assert_eq;

// ==================== Fixture Contract ====================

#[test]
fn test_fixture_loads() {
    let doc = ubuntu().unwrap();

    assert_eq!(doc.users().len(), 1);
    assert_eq!(doc.users()[0].name, "cloud");
    assert_eq!(doc.write_files().len(), 4);
    assert_eq!(doc.write_files()[2].path, "/etc/systemd/system/vfio.service");
}

#[test]
fn test_fixture_user() {
    let doc = ubuntu().unwrap();
    let user = doc.user("cloud").unwrap();

    assert!(user.passwd.as_deref().unwrap().starts_with("$6$"));
    assert_eq!(user.sudo, vec!["ALL=(ALL) NOPASSWD:ALL"]);
    assert_eq!(user.shell.as_deref(), Some("/bin/bash"));
    assert_eq!(user.lock_passwd, Some(false));
    assert_eq!(user.inactive, Some(false));
}

#[test]
fn test_fixture_file_order() {
    let doc = ubuntu().unwrap();
    let paths: Vec<&str> = doc.write_files().iter().map(|f| f.path.as_str()).collect();

    assert_eq!(
        paths,
        vec![
            "/etc/systemd/network/00-static-l1.network",
            "/etc/systemd/network/00-static-l2.network",
            "/etc/systemd/system/vfio.service",
            "/usr/bin/cloud-hypervisor-vfio.sh",
        ]
    );
}

#[test]
fn test_fixture_permissions() {
    let doc = ubuntu().unwrap();
    let modes: Vec<u32> = doc
        .write_files()
        .iter()
        .map(|f| f.permissions.mode())
        .collect();

    assert_eq!(modes, vec![0o644, 0o644, 0o644, 0o755]);
    assert!(doc.file("/usr/bin/cloud-hypervisor-vfio.sh").unwrap().permissions.is_executable());
}

#[test]
fn test_fixture_service_content_exact() {
    let doc = ubuntu().unwrap();
    let unit = &doc.write_files()[2].content;

    assert_eq!(
        unit,
        "[Unit]\n\
         Description=VFIO test systemd service\n\
         \n\
         [Service]\n\
         Type=simple\n\
         ExecStart=/usr/bin/cloud-hypervisor-vfio.sh\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target\n"
    );
}

#[test]
fn test_fixture_network_content() {
    let doc = ubuntu().unwrap();
    let l1 = &doc.write_files()[0].content;

    assert!(l1.starts_with("[Match]\nMACAddress=12:34:56:78:90:ab\n\n[Network]\n"));
    assert!(l1.ends_with("Gateway=192.168.2.1\n"));
}

#[test]
fn test_fixture_script_kept_verbatim() {
    let doc = ubuntu().unwrap();
    let script = &doc.write_files()[3].content;

    assert!(script.starts_with("#!/bin/bash\n\n"));
    // Escapes inside the literal block are not interpreted
    assert!(script.contains(r"/sys/bus/pci/devices/0000\:00\:06.0/driver/unbind"));
    assert!(script.contains("mount -t hugetlbfs hugetlbfs /mnt/hugepages\n"));
}

#[test]
fn test_fixture_sections() {
    let doc = ubuntu().unwrap();

    assert_eq!(doc.sections().to_vec(), vec![Section::SshPwauth(true)]);
}

#[test]
fn test_fixture_from_str() {
    let doc: ConfigDocument = UBUNTU_USER_DATA.parse().unwrap();
    assert_eq!(doc, ubuntu().unwrap());
}

// ==================== Broken Fixtures ====================

#[test]
fn test_fixture_without_write_files() {
    let truncated = UBUNTU_USER_DATA.split("write_files:").next().unwrap();

    let err = load(truncated).unwrap_err();
    assert_eq!(err, LoadError::MissingField("write_files".to_string()));
}

#[test]
fn test_fixture_bad_permissions() {
    let broken = UBUNTU_USER_DATA.replacen("permissions: 0755", "permissions: \"777x\"", 1);

    let err = load(&broken).unwrap_err();
    assert_eq!(
        err,
        LoadError::InvalidPermissions {
            path: "/usr/bin/cloud-hypervisor-vfio.sh".to_string(),
            value: "777x".to_string(),
        }
    );
}

#[test]
fn test_fixture_empty_user_name() {
    let broken = UBUNTU_USER_DATA.replacen("name: cloud", "name: \"\"", 1);

    let err = load(&broken).unwrap_err();
    assert_eq!(err, LoadError::EmptyUserName { index: 0 });
}

#[test]
fn test_fixture_missing_content() {
    let broken = UBUNTU_USER_DATA.replacen(
        "    path: /etc/systemd/system/vfio.service\n    permissions: 0644\n    content: |",
        "    path: /etc/systemd/system/vfio.service\n    permissions: 0644\n    unused: |",
        1,
    );

    let err = load(&broken).unwrap_err();
    assert_eq!(
        err,
        LoadError::MissingField("write_files[2].content".to_string())
    );
}

#[test]
fn test_fixture_syntax_error() {
    let broken = UBUNTU_USER_DATA.replacen("ssh_pwauth: True", "ssh_pwauth: [True", 1);

    let err = load(&broken).unwrap_err();
    match err {
        LoadError::Parse { location, .. } => assert!(location.unwrap().line > 1),
        other => panic!("Expected Parse, got {other:?}"),
    }
}

// ==================== Re-rendering ====================

#[test]
fn test_fixture_round_trip() {
    let doc = ubuntu().unwrap();
    let rendered = doc.to_yaml().unwrap();
    let again = load(&rendered).unwrap();

    assert_eq!(doc, again);
}
