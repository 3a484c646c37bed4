use super::*;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn first_log_writes_header_then_rows() {
    let temp_dir = TempDir::new().unwrap();
    let logger = QueryLogger::new(temp_dir.path().join("queries.csv"));

    logger.log("list files", "ls -la").unwrap();
    logger.log("disk usage", "df -h").unwrap();

    let content = fs::read_to_string(logger.path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], HEADER);
    assert!(lines[1].ends_with(",list files,ls -la"));
    assert!(lines[2].ends_with(",disk usage,df -h"));
}

#[test]
fn timestamp_is_truncated_to_seconds() {
    let temp_dir = TempDir::new().unwrap();
    let logger = QueryLogger::new(temp_dir.path().join("queries.csv"));
    logger.log("q", "a").unwrap();

    let content = fs::read_to_string(logger.path()).unwrap();
    let row = content.lines().nth(1).unwrap();
    let timestamp = row.split(',').next().unwrap();

    assert_eq!(timestamp.len(), "2024-01-01T12:00:00".len());
    assert!(chrono::NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S").is_ok());
}

#[test]
fn existing_file_keeps_single_header() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("queries.csv");
    fs::write(&path, format!("{HEADER}\n2024-01-01T00:00:00,old,row\n")).unwrap();

    QueryLogger::new(&path).log("new", "row").unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content.matches(HEADER).count(), 1);
    assert_eq!(content.lines().count(), 3);
}

#[test]
fn parent_directories_are_created() {
    let temp_dir = TempDir::new().unwrap();
    let logger = QueryLogger::new(temp_dir.path().join("logs/nested/queries.csv"));
    logger.log("q", "a").unwrap();
    assert!(logger.path().exists());
}

#[test]
fn answer_is_cut_after_first_code_block() {
    let answer = "```bash\nls -la\n```\nLists files.\n```bash\nls -lah\n```";
    assert_eq!(truncate_after_first_block(answer), "```bash\nls -la\n```");

    assert_eq!(truncate_after_first_block("plain text"), "plain text");
    assert_eq!(truncate_after_first_block("```bash\nunterminated"), "```bash\nunterminated");
}

#[test]
fn rows_survive_separators_quotes_and_line_breaks() {
    let temp_dir = TempDir::new().unwrap();
    let logger = QueryLogger::new(temp_dir.path().join("queries.csv"));
    let answer = "```bash\nfind . -name \"*.log\", -delete\n```";

    logger.log("remove logs, recursively", answer).unwrap();

    let mut reader = csv::Reader::from_path(logger.path()).unwrap();
    assert_eq!(reader.headers().unwrap(), vec!["datetime", "question", "answer"]);
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][1], "remove logs, recursively");
    assert_eq!(&rows[0][2], answer);
}

#[test]
fn concurrent_writers_do_not_interleave() {
    let temp_dir = TempDir::new().unwrap();
    let logger = Arc::new(QueryLogger::new(temp_dir.path().join("queries.csv")));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let logger = Arc::clone(&logger);
            std::thread::spawn(move || logger.log(&format!("question {i}"), "answer").unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let content = fs::read_to_string(logger.path()).unwrap();
    assert_eq!(content.matches(HEADER).count(), 1);
    assert_eq!(content.lines().count(), 9);
}
