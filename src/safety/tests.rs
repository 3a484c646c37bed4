use super::*;

#[test]
fn flags_denylisted_commands() {
    let scanner = SafetyScanner::default();
    assert!(scanner.scan("```bash\nsudo rm -rf /tmp/cache\n```"));
    assert!(scanner.scan("Use `dd if=/dev/zero of=/dev/sda`"));
    assert!(scanner.scan(":(){:|:&};:"));
    assert!(scanner.scan("sudo shutdown -h now"));
}

#[test]
fn matching_ignores_case() {
    let scanner = SafetyScanner::default();
    assert!(scanner.scan("RM -RF /"));
    assert!(scanner.scan("chown -R user:user /srv"));
}

#[test]
fn harmless_answers_pass() {
    let scanner = SafetyScanner::default();
    assert!(!scanner.scan("```bash\nls -la\n```\nLists every file, hidden ones included."));
    assert!(!scanner.scan(""));
}

#[test]
fn annotate_appends_banner_only_when_flagged() {
    let scanner = SafetyScanner::default();

    let (text, dangerous) = scanner.annotate("sudo reboot");
    assert!(dangerous);
    assert!(text.starts_with("sudo reboot"));
    assert!(text.ends_with(WARNING_BANNER));

    let (text, dangerous) = scanner.annotate("uptime");
    assert!(!dangerous);
    assert_eq!(text, "uptime");
}

#[test]
fn custom_denylist_replaces_defaults() {
    let scanner = SafetyScanner::new(["Format C:", "  "]);
    assert_eq!(scanner.keywords(), ["format c:".to_string()]);
    assert!(scanner.scan("format c: /q"));
    assert!(!scanner.scan("rm -rf /"));
}

#[test]
fn first_match_names_the_keyword() {
    let scanner = SafetyScanner::default();
    assert_eq!(scanner.first_match("kill -9 1234"), Some("kill -9"));
    assert_eq!(scanner.first_match("kill 1234"), None);
}
