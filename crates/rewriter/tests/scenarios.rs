use html_test_support::{BoundaryPolicy, chunk_plans_from_env};
use rewriter::{
    ContentType, Directive, DocumentContentHandlers, ElementContentHandlers, MemorySettings,
    RewriteStrError, RewriterBuilder, RewritingError, Selector, SelectorError, Settings,
    rewrite_str,
};

fn selector(source: &str) -> Selector {
    source.parse().expect("valid selector")
}

fn run(input: &str, builder: RewriterBuilder<'_>) -> String {
    rewrite_str(input, builder, &Settings::default()).expect("rewrite")
}

#[test]
fn comment_text_is_replaced() {
    let mut builder = RewriterBuilder::new();
    builder.on_document(DocumentContentHandlers::default().comments(|comment| {
        assert_eq!(comment.text(), "Hey 42");
        comment.set_text("Yo").expect("valid comment text");
        Directive::Continue
    }));
    assert_eq!(run("<!--Hey 42-->", builder), "<!--Yo-->");
}

#[test]
fn comment_in_matched_element_is_replaced_with_markup() {
    let mut builder = RewriterBuilder::new();
    builder.on(
        &selector("*"),
        ElementContentHandlers::default().comments(|comment| {
            comment.replace("<repl>", ContentType::Html);
            Directive::Continue
        }),
    );
    assert_eq!(run("<div><!--hello--></div>", builder), "<div><repl></div>");
}

#[test]
fn attributes_are_removed_and_added() {
    let mut builder = RewriterBuilder::new();
    builder.on(
        &selector("span"),
        ElementContentHandlers::default().element(|el| {
            el.remove_attribute("foo");
            el.set_attribute("Bar", "hey").expect("valid attribute");
            Directive::Continue
        }),
    );
    assert_eq!(run("<span foo=42>", builder), "<span bar=\"hey\">");
}

#[test]
fn removed_element_takes_its_content_along() {
    let input = "<div><span>42</span></div><h1>Hello</h1><h2>Hello2</h2>";
    for case in chunk_plans_from_env(input.as_bytes(), BoundaryPolicy::ByteStream) {
        let mut builder = RewriterBuilder::new();
        builder.on(
            &selector("h1"),
            ElementContentHandlers::default().element(|el| {
                el.remove();
                Directive::Continue
            }),
        );
        let mut output = Vec::new();
        let mut rewriter = builder
            .build(&Settings::default(), |chunk: &[u8]| output.extend_from_slice(chunk))
            .expect("build");
        case.plan.for_each_chunk(input.as_bytes(), |chunk| {
            rewriter.write(chunk).expect("write");
        });
        rewriter.end().expect("end");
        drop(rewriter);
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "<div><span>42</span></div><h2>Hello2</h2>",
            "plan {}",
            case.label
        );
    }
}

#[test]
fn buffered_attribute_over_the_memory_limit_fails() {
    let settings = Settings {
        memory: MemorySettings {
            preallocated_parsing_buffer_size: 0,
            max_allowed_memory_usage: 5,
        },
        ..Settings::default()
    };
    let err = rewrite_str("<span alt='aaaaa", RewriterBuilder::new(), &settings).unwrap_err();
    assert!(
        matches!(
            err,
            RewriteStrError::Rewriting(RewritingError::MemoryLimitExceeded(_))
        ),
        "{err:?}"
    );
}

#[test]
fn unsupported_pseudo_classes_are_rejected() {
    assert_eq!(
        "p:last-child".parse::<Selector>().unwrap_err(),
        SelectorError::UnsupportedPseudoClassOrElement
    );
}

#[test]
fn inserted_text_is_escaped_and_markup_is_not() {
    let mut builder = RewriterBuilder::new();
    builder.on(
        &selector("p"),
        ElementContentHandlers::default().element(|el| {
            el.before("<b>Tom & Jerry</b>", ContentType::Html);
            el.after("<b>Tom & Jerry</b>", ContentType::Text);
            Directive::Continue
        }),
    );
    assert_eq!(
        run("<p></p>", builder),
        "<b>Tom & Jerry</b><p></p>&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;"
    );
}

#[test]
fn stop_skips_later_handlers() {
    let mut builder = RewriterBuilder::new();
    builder
        .on(
            &selector("p"),
            ElementContentHandlers::default().element(|_| Directive::Stop),
        )
        .on(
            &selector("p"),
            ElementContentHandlers::default().element(|_| panic!("runs after stop")),
        );
    let err = rewrite_str("<p>x</p>", builder, &Settings::default()).unwrap_err();
    assert!(
        matches!(err, RewriteStrError::Rewriting(RewritingError::Stopped)),
        "{err:?}"
    );
}

#[test]
fn unchanged_documents_pass_through() {
    let input = "<!doctype html><html lang=en><head><meta charset=utf-8>\
                 <title>T &amp; C</title><script>let a = '<p>';</script></head>\
                 <body><p class=x>caf\u{e9}<!-- c --><br></body></html>";
    assert_eq!(run(input, RewriterBuilder::new()), input);
}
