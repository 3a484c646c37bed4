use super::*;
use crate::testing::FakeChat;

#[test]
fn context_lists_one_bullet_per_entry() {
    let context = build_context([("ls -la", "list all files"), ("pwd", "print directory")]);
    assert_eq!(context, "- ls -la :: list all files\n- pwd :: print directory\n");
    assert_eq!(build_context(std::iter::empty()), "");
}

#[test]
fn verbose_prompt_asks_for_block_explanation_and_improvement() {
    let prompt = build_answer_prompt("list files", "- ls :: list\n", AnswerMode::Verbose, "French");
    assert!(prompt.contains("Answer in French"));
    assert!(prompt.contains("```bash"));
    assert!(prompt.contains("short explanation"));
    assert!(prompt.contains("improved version"));
    assert!(prompt.contains("Question: list files"));
    assert!(prompt.ends_with("Context:\n- ls :: list\n"));
}

#[test]
fn strict_prompt_asks_for_block_only() {
    let prompt = build_answer_prompt("list files", "- ls :: list", AnswerMode::Strict, "English");
    assert!(prompt.contains("nothing else"));
    assert!(!prompt.contains("explanation"));
    assert!(prompt.contains("Answer in English"));
}

#[test]
fn generator_calls_model_once_at_zero_temperature() {
    let chat = Arc::new(FakeChat::replying(&["  ```bash\nls -la\n```  \n"]));
    let generator = AnswerGenerator::new(chat.clone(), "French");

    let answer = generator
        .generate("list files", "- ls -la :: list all", AnswerMode::Verbose)
        .unwrap();

    assert_eq!(answer, "```bash\nls -la\n```");
    let prompts = chat.prompts();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].1, 0.0);
}

#[test]
fn generator_surfaces_model_failure() {
    let generator = AnswerGenerator::new(Arc::new(FakeChat::failing("quota exceeded")), "French");
    let err = generator
        .generate("list files", "- ls :: list", AnswerMode::Strict)
        .unwrap_err();
    assert!(matches!(err, RagError::Model(msg) if msg == "quota exceeded"));
}

#[test]
fn blank_model_output_is_an_error() {
    let generator = AnswerGenerator::new(Arc::new(FakeChat::replying(&["   "])), "French");
    assert!(generator.generate("q", "ctx", AnswerMode::Verbose).is_err());
}

#[test]
fn rerank_output_keeps_ranked_lines_only() {
    let parsed = parse_rerank_output("1. alpha :: desc-a\n2. beta :: desc-b\nnoise line");
    assert_eq!(
        parsed,
        RerankParse::Parsed(vec![
            RerankedCandidate {
                primary: "alpha".to_string(),
                secondary: "desc-a".to_string(),
                confidence: 1.0,
            },
            RerankedCandidate {
                primary: "beta".to_string(),
                secondary: "desc-b".to_string(),
                confidence: 0.8,
            },
        ])
    );
}

#[test]
fn rerank_output_without_ranked_lines_is_unparseable() {
    assert_eq!(
        parse_rerank_output("Here are my picks:\n- alpha :: a\n3. gamma :: c"),
        RerankParse::Unparseable
    );
    assert_eq!(parse_rerank_output(""), RerankParse::Unparseable);
    assert!(parse_rerank_output("1. missing separator").into_vec().is_empty());
}

#[test]
fn rerank_output_is_truncated_to_two() {
    let entries = parse_rerank_output("1. a :: x\n2. b :: y\n1. c :: z").into_vec();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].primary, "b");
}

#[test]
fn rerank_prompt_lists_every_candidate() {
    let prompt = build_rerank_prompt("free disk", &[("df -h", "disk usage"), ("du -sh", "dir size")]);
    assert!(prompt.contains("Question: free disk"));
    assert!(prompt.contains("- df -h :: disk usage"));
    assert!(prompt.contains("- du -sh :: dir size"));
    assert!(prompt.contains("1. <command> :: <description>"));
}

#[test]
fn reranker_tolerates_malformed_output() {
    let chat = Arc::new(FakeChat::replying(&["no idea"]));
    let reranker = Reranker::new(chat.clone());

    let entries = reranker.rerank("q", &[("ls", "list")]).unwrap();
    assert!(entries.is_empty());
    assert_eq!(chat.calls(), 1);
}

#[test]
fn reranker_skips_model_for_empty_shortlist() {
    let chat = Arc::new(FakeChat::replying(&[]));
    let reranker = Reranker::new(chat.clone());
    assert!(reranker.rerank("q", &[]).unwrap().is_empty());
    assert_eq!(chat.calls(), 0);
}

#[test]
fn answer_mode_reads_snake_case() {
    #[derive(serde::Deserialize)]
    struct Wrapper {
        mode: AnswerMode,
    }

    let wrapper: Wrapper = toml::from_str("mode = \"strict\"").unwrap();
    assert_eq!(wrapper.mode, AnswerMode::Strict);
    assert_eq!(AnswerMode::default().to_string(), "verbose");
}
