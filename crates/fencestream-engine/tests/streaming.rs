use std::collections::HashMap;

use fencestream_engine::{
    Action, ActionKind, BlockParser, DrawLookup, MessageKind, MessageResolver, Page, ParserError,
    ParserOptions, ParserState, RunningKind,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn run(chunks: &[&str]) -> (Vec<Action>, Vec<Page>) {
    let mut parser = BlockParser::default();
    let mut out = vec![];
    for chunk in chunks {
        parser.push_text(chunk, &mut |a| out.push(a)).unwrap();
    }
    (out, parser.into_pages().into_pages())
}

fn structured(actions: &[Action]) -> Vec<Action> {
    actions.iter().filter(|a| !a.is_text()).cloned().collect()
}

fn summary(actions: &[Action]) -> Vec<(&'static str, Option<String>, String)> {
    actions
        .iter()
        .map(|a| {
            let page = a.target_page().map(str::to_string);
            match &a.kind {
                ActionKind::Text { chunk } => ("text", page, chunk.clone()),
                ActionKind::Page(p) => ("page", page, p.page_type.clone()),
                ActionKind::SetDiagram { content } => ("set-diagram", page, content.clone()),
                ActionKind::Note { content } => ("note", page, content.clone()),
                other => panic!("unexpected action {other:?}"),
            }
        })
        .collect()
}

#[test]
fn example_stream_end_to_end() {
    let (actions, pages) = run(&["Explain:\n``", "`mer", "maid[p1]\nA-->B\n```\nDone"]);

    insta::assert_debug_snapshot!(summary(&actions), @r#"
    [
        (
            "text",
            None,
            "Explain:\n",
        ),
        (
            "page",
            Some(
                "p1",
            ),
            "mermaid",
        ),
        (
            "set-diagram",
            Some(
                "p1",
            ),
            "A-->B",
        ),
        (
            "text",
            None,
            "Done",
        ),
    ]
    "#);

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].steps, vec![actions[2].clone()]);
}

const BLOCKS: &[&str] = &[
    "Explain:\n```mermaid[p1]\nA-->B\n```\nDone",
    "```note[n1;Key idea]\n  indented\n\ntrailing   \n```\n",
    "pre ```mermaid [p2]|Flow über alles \r\ngraph LR\r\n  x-->y\r\n``` \r\nafter",
    "```mermaid[p1]\nfirst\n```\n```note[p1]\nsecond\n```\n",
    "```mermaid[p3]\nnot ``` closed\n```js\nstill content\n```\n",
];

#[rstest]
#[case(0)]
#[case(1)]
#[case(2)]
#[case(3)]
#[case(4)]
fn every_two_way_split_yields_the_same_blocks(#[case] fixture: usize) {
    let input = BLOCKS[fixture];
    let (whole, whole_pages) = run(&[input]);
    assert!(!structured(&whole).is_empty());

    for at in (1..input.len()).filter(|&i| input.is_char_boundary(i)) {
        let (split, pages) = run(&[&input[..at], &input[at..]]);
        assert_eq!(structured(&split), structured(&whole), "split at {at}");
        assert_eq!(pages, whole_pages, "split at {at}");
    }
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(2)]
#[case(3)]
#[case(4)]
fn char_by_char_stream_yields_the_same_blocks(#[case] fixture: usize) {
    let input = BLOCKS[fixture];
    let (whole, whole_pages) = run(&[input]);

    let chars: Vec<String> = input.chars().map(String::from).collect();
    let chunks: Vec<&str> = chars.iter().map(String::as_str).collect();
    let (streamed, pages) = run(&chunks);

    assert_eq!(structured(&streamed), structured(&whole));
    assert_eq!(pages, whole_pages);
}

#[test]
fn three_way_splits_yield_the_same_blocks() {
    let input = BLOCKS[0];
    let (whole, _) = run(&[input]);
    for a in 1..input.len() {
        for b in a + 1..input.len() {
            let (split, _) = run(&[&input[..a], &input[a..b], &input[b..]]);
            assert_eq!(structured(&split), structured(&whole), "split at {a}/{b}");
        }
    }
}

#[test]
fn block_content_is_trimmed_only_at_the_end() {
    let (actions, pages) = run(&[BLOCKS[1]]);
    assert_eq!(
        summary(&actions),
        [
            ("page", Some("n1".to_string()), "note".to_string()),
            (
                "note",
                Some("n1".to_string()),
                "  indented\n\ntrailing".to_string()
            ),
        ]
    );
    assert_eq!(pages[0].title, "Key idea");
    assert_eq!(pages[0].notes, ["  indented\n\ntrailing"]);
}

#[test]
fn inner_markers_are_content() {
    let (actions, _) = run(&[BLOCKS[4]]);
    assert_eq!(
        summary(&actions)[1].2,
        "not ``` closed\n```js\nstill content"
    );
}

#[rstest]
#[case(&["one `"], &["one "])]
#[case(&["one ``"], &["one "])]
#[case(&["one ``", "x"], &["one ", "``x"])]
#[case(&["one `", "`", "x"], &["one ", "``x"])]
fn trailing_backticks_are_withheld(#[case] chunks: &[&str], #[case] expected: &[&str]) {
    let (actions, _) = run(chunks);
    let texts: Vec<Action> = expected.iter().map(|t| Action::text(*t)).collect();
    assert_eq!(actions, texts);
}

#[test]
fn whitespace_only_narration_is_never_emitted() {
    let (actions, _) = run(&["Hello", " ", "\n", "world", "```mermaid[p1]\nA\n```", "\n\n"]);
    assert_eq!(
        summary(&actions)
            .into_iter()
            .filter(|(kind, ..)| *kind == "text")
            .map(|(.., text)| text)
            .collect::<Vec<_>>(),
        ["Hello", "world"]
    );
}

#[test]
fn empty_block_leaves_registry_untouched() {
    let mut parser = BlockParser::default();
    let mut out = vec![];
    parser
        .push_text("```mermaid[p1]\n   \n```\n", &mut |a| out.push(a))
        .unwrap();
    assert!(out.is_empty());
    assert!(parser.pages().is_empty());
    assert_eq!(parser.state(), ParserState::Idle);
}

/// Runs `chunks` through a parser capped at `limit` bytes, returning the
/// emitted actions and the page of every aborted block.
fn run_capped(limit: usize, chunks: &[&str]) -> (Vec<Action>, Vec<Option<String>>) {
    let mut parser = BlockParser::new(ParserOptions {
        max_block_bytes: Some(limit),
        ..Default::default()
    });
    let mut out = vec![];
    let mut aborted = vec![];
    for chunk in chunks {
        if let Err(ParserError::BlockTooLarge { meta, .. }) =
            parser.push_text(chunk, &mut |a| out.push(a))
        {
            aborted.push(meta.map(|m| m.page));
        }
    }
    parser.finish(&mut |a| out.push(a)).unwrap();
    (out, aborted)
}

/// Narration with whitespace removed, so differently chunked text compares equal.
fn narration(actions: &[Action]) -> String {
    actions
        .iter()
        .filter_map(|a| match &a.kind {
            ActionKind::Text { chunk } => Some(chunk.as_str()),
            _ => None,
        })
        .flat_map(str::chars)
        .filter(|c| !c.is_whitespace())
        .collect()
}

const CAPPED: &str =
    "Intro\n```mermaid[p1]\ngraph TD\n  A-->B\n```\nDone\n```note[n1]\nshort\n```\nBye";

#[test]
fn oversized_block_is_dropped_whole_at_every_split() {
    let (whole, aborted) = run_capped(16, &[CAPPED]);
    assert_eq!(aborted, [Some("p1".to_string())]);
    assert_eq!(narration(&whole), "IntroDoneBye");
    assert_eq!(
        summary(&structured(&whole)),
        [
            ("page", Some("n1".to_string()), "note".to_string()),
            ("note", Some("n1".to_string()), "short".to_string()),
        ]
    );

    for at in (1..CAPPED.len()).filter(|&i| CAPPED.is_char_boundary(i)) {
        let (split, aborted) = run_capped(16, &[&CAPPED[..at], &CAPPED[at..]]);
        assert_eq!(structured(&split), structured(&whole), "split at {at}");
        assert_eq!(narration(&split), "IntroDoneBye", "split at {at}");
        assert_eq!(aborted, [Some("p1".to_string())], "split at {at}");
    }

    let chars: Vec<String> = CAPPED.chars().map(String::from).collect();
    let chunks: Vec<&str> = chars.iter().map(String::as_str).collect();
    let (streamed, aborted) = run_capped(16, &chunks);
    assert_eq!(structured(&streamed), structured(&whole));
    assert_eq!(narration(&streamed), "IntroDoneBye");
    assert_eq!(aborted.len(), 1);
}

#[rstest]
#[case(&["```mermaid[p1]\ngraph TD\n  A", "-->B\n```\nDone\n"])]
#[case(&["```mermaid[p1]\ngraph TD\n  A-->B\n```\nDone\n"])]
#[case(&["```mermaid[p1]\ngraph TD\n  A-->B\n`", "``", "\nDone\n"])]
fn narration_after_an_aborted_block_survives(#[case] chunks: &[&str]) {
    let (actions, aborted) = run_capped(16, chunks);
    assert_eq!(actions, [Action::text("Done\n")]);
    assert_eq!(aborted, [Some("p1".to_string())]);
}

#[test]
fn blocks_within_the_cap_match_the_uncapped_parser() {
    for &input in BLOCKS {
        let (uncapped, _) = run(&[input]);
        let (capped, aborted) = run_capped(64, &[input]);
        assert!(aborted.is_empty(), "{input:?}");
        assert_eq!(structured(&capped), structured(&uncapped));
    }
}

fn apply_all(lookup: DrawLookup, actions: &[Action]) -> MessageResolver {
    let mut resolver = MessageResolver::new().with_draw_lookup(lookup);
    for action in actions {
        resolver.apply(action);
    }
    resolver
}

fn alphabet() -> Vec<Action> {
    vec![
        Action::text("t"),
        Action::for_page("p1", ActionKind::NoteStart {}),
        Action::for_page("p1", ActionKind::NoteEnd {}),
        Action::for_page("p2", ActionKind::NoteStart {}),
        Action::for_page("p1", ActionKind::DiagramStart {}),
        Action::for_page("p1", ActionKind::DiagramEnd {}),
        Action::for_page(
            "p1",
            ActionKind::SetDiagram {
                content: "A".into(),
            },
        ),
        Action::for_page(
            "p1",
            ActionKind::DrawStart {
                page: "p1".into(),
                input: "i".into(),
            },
        ),
        Action::for_page(
            "p1",
            ActionKind::DrawEnd {
                result: "r".into(),
            },
        ),
    ]
}

#[rstest]
#[case(DrawLookup::LastMessage)]
#[case(DrawLookup::RunningForPage)]
fn at_most_one_running_message_per_page_and_kind(#[case] lookup: DrawLookup) {
    let alphabet = alphabet();
    let n = alphabet.len();
    for code in 0..n.pow(4) {
        let sequence: Vec<Action> = (0..4)
            .map(|digit| alphabet[(code / n.pow(digit)) % n].clone())
            .collect();
        let resolver = apply_all(lookup, &sequence);

        let mut running: HashMap<(String, RunningKind), usize> = HashMap::new();
        for message in resolver.messages().iter().filter(|m| m.running) {
            if let (Some(page), Some(kind)) = (&message.page, message.kind.running_kind()) {
                *running.entry((page.clone(), kind)).or_default() += 1;
            }
        }
        assert!(
            running.values().all(|&count| count <= 1),
            "{sequence:?} left {running:?}"
        );
    }
}

#[test]
fn paired_lifecycle_yields_one_message() {
    let mut resolver = MessageResolver::new();
    resolver.apply(&Action::for_page("p", ActionKind::NoteStart {}));
    assert!(resolver.messages()[0].running);
    resolver.apply(&Action::for_page("p", ActionKind::NoteEnd {}));

    let notes: Vec<_> = resolver
        .messages()
        .iter()
        .filter(|m| m.kind == MessageKind::Note && m.page.as_deref() == Some("p"))
        .collect();
    assert_eq!(notes.len(), 1);
    assert!(!notes[0].running);
}

#[test]
fn parser_output_drives_message_list() {
    let (actions, _) = run(&["Hello ", "world", "```mermaid[p1]\nA\n```\n", "Bye"]);
    let resolver = apply_all(DrawLookup::default(), &actions);

    let rendered: Vec<(&str, Option<&str>)> = resolver
        .messages()
        .iter()
        .map(|m| {
            let text = match &m.kind {
                MessageKind::Assistant { content } => Some(content.as_str()),
                _ => None,
            };
            (m.kind.label(), text)
        })
        .collect();
    assert_eq!(
        rendered,
        [
            ("assistant", Some("Hello world")),
            ("page", None),
            ("set-diagram", None),
            ("assistant", Some("Bye")),
        ]
    );
}

#[test]
fn restored_pages_are_not_recreated() {
    let mut parser = BlockParser::default().with_pages(
        fencestream_engine::PageRegistry::from_pages(vec![Page::new("p1", "mermaid", None)]),
    );
    let mut out = vec![];
    parser
        .push_text("```mermaid[p1]\nA\n```\n", &mut |a| out.push(a))
        .unwrap();
    assert_eq!(summary(&out), [("set-diagram", Some("p1".to_string()), "A".to_string())]);
    assert_eq!(parser.pages().get("p1").unwrap().steps.len(), 1);
}
