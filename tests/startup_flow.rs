use std::fs;

use bifrost::cli::CliCommand;
use bifrost::{AppConfig, MigrationBootstrap};
use tempfile::TempDir;

#[test]
fn legacy_install_is_migrated_and_listed() {
    let root = TempDir::new().unwrap();
    let install = root.path().join("install");
    fs::create_dir_all(install.join("icons")).unwrap();
    fs::write(
        install.join("config.json"),
        r#"{
            "settings": { "always_on_top": true, "group_order": ["Work", "Home"] },
            "apps": [
                { "name": "Mail", "type": "auto", "group": "Work", "action": "https://mail.example.com", "icon": "auto_mail.png", "shortcut": "Ctrl+Alt+M" },
                { "name": "Notes", "type": "auto", "group": "", "action": "/home/me/notes.txt", "icon": "", "shortcut": "" }
            ]
        }"#,
    )
    .unwrap();
    fs::write(install.join("icons").join("auto_mail.png"), b"png").unwrap();

    let config = AppConfig::from_data_dir(root.path().join("data"))
        .unwrap()
        .with_install_dir(install);
    let report = MigrationBootstrap::new(&config).run();
    assert!(report.migrated_config);
    assert!(config.icon_dir().join("auto_mail.png").is_file());

    let mut output = Vec::new();
    bifrost::commands::execute(&config, CliCommand::List, &mut output).unwrap();
    let output = String::from_utf8(output).unwrap();

    assert_eq!(
        output,
        "[Work]\n  Mail  https://mail.example.com  <Ctrl+Alt+M>\n[Home]\n  Notes  /home/me/notes.txt\n"
    );

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(config.config_path()).unwrap()).unwrap();
    assert!(saved.get("apps").is_none());
    assert_eq!(saved["entries"][0]["kind"], "auto");
}
