use std::cell::RefCell;

use html_test_support::{BoundaryPolicy, ChunkPlan, chunk_plans_from_env};
use rewriter::{
    BuildError, ContentType, Directive, DocumentContentHandlers, ElementContentHandlers,
    MemorySettings, RewriterBuilder, RewriterState, RewritingError, Selector, Settings, TextType,
    UserData, streaming,
};

const CORPUS: &[&str] = &[
    "",
    "<!DOCTYPE html><html><head><title>A &amp; B</title></head><body><p>x</p></body></html>",
    "<div class=\"a\" id='b' data-x=y hidden>caf\u{e9} \u{1F600}<br/><img src=x></div>",
    "<script>if (a < b) { s = '</div>'; }</script><style>p > a {}</style>",
    "<!-- c --><?pi?><ul><li>one<li>two</ul></p>stray",
    "<svg><![CDATA[<raw>]]><circle r=1/></svg><textarea><b></textarea>",
    "<p>unterminated <a href=\"x",
];

fn selector(source: &str) -> Selector {
    source.parse().expect("valid selector")
}

/// Feed `input` through a rewriter built from `builder` in the chunks `plan`
/// describes.
fn rewrite_chunked(
    input: &[u8],
    plan: &ChunkPlan,
    builder: &mut RewriterBuilder<'_>,
    settings: &Settings,
) -> Result<Vec<u8>, RewritingError> {
    let mut output = Vec::new();
    {
        let mut rewriter = builder
            .build(settings, |chunk: &[u8]| output.extend_from_slice(chunk))
            .expect("build");
        let mut result = Ok(());
        plan.for_each_chunk(input, |chunk| {
            if result.is_ok() {
                result = rewriter.write(chunk);
            }
        });
        result?;
        rewriter.end()?;
    }
    Ok(output)
}

fn rewrite(input: &str, builder: &mut RewriterBuilder<'_>) -> Result<String, RewritingError> {
    let output = rewrite_chunked(
        input.as_bytes(),
        &ChunkPlan::Whole,
        builder,
        &Settings::default(),
    )?;
    Ok(String::from_utf8(output).expect("utf-8 output"))
}

fn observing_builder<'h>() -> RewriterBuilder<'h> {
    let mut builder = RewriterBuilder::new();
    builder
        .on_document(
            DocumentContentHandlers::default()
                .doctype(|_| Directive::Continue)
                .comments(|_| Directive::Continue)
                .text(|_| Directive::Continue)
                .end(|_| Directive::Continue),
        )
        .on(
            &selector("*"),
            ElementContentHandlers::default()
                .element(|el| {
                    let _ = el.tag_name();
                    Directive::Continue
                })
                .text(|_| Directive::Continue),
        )
        .on(
            &selector("div p"),
            ElementContentHandlers::default().element(|el| {
                el.on_end_tag(|_| Directive::Continue).ok();
                Directive::Continue
            }),
        )
        .on(
            &selector("ul > li"),
            ElementContentHandlers::default().element(|el| {
                el.on_end_tag(|_| Directive::Continue).ok();
                Directive::Continue
            }),
        );
    builder
}

#[test]
fn output_equals_input_without_mutations() {
    for input in CORPUS {
        let bytes = input.as_bytes();
        for policy in [BoundaryPolicy::Utf8Aligned, BoundaryPolicy::ByteStream] {
            for case in chunk_plans_from_env(bytes, policy) {
                let plain = rewrite_chunked(
                    bytes,
                    &case.plan,
                    &mut RewriterBuilder::new(),
                    &Settings::default(),
                )
                .expect("rewrite");
                assert_eq!(plain, bytes, "no handlers, input {input:?}, plan {}", case.label);

                let observed = rewrite_chunked(
                    bytes,
                    &case.plan,
                    &mut observing_builder(),
                    &Settings::default(),
                )
                .expect("rewrite");
                assert_eq!(observed, bytes, "observing, input {input:?}, plan {}", case.label);
            }
        }
    }
}

#[test]
fn text_chunks_reassemble_into_text_nodes() {
    let input = "<p>caf\u{e9} \u{1F600} &amp; more</p><script>a<b</script>";
    let expected = vec![
        (TextType::Data, "caf\u{e9} \u{1F600} &amp; more".to_string()),
        (TextType::ScriptData, "a<b".to_string()),
    ];
    for case in chunk_plans_from_env(input.as_bytes(), BoundaryPolicy::ByteStream) {
        let nodes = RefCell::new(Vec::new());
        let current = RefCell::new(String::new());
        let mut builder = RewriterBuilder::new();
        builder.on_document(DocumentContentHandlers::default().text(|chunk| {
            current.borrow_mut().push_str(chunk.as_str());
            if chunk.last_in_text_node() {
                let text = std::mem::take(&mut *current.borrow_mut());
                nodes.borrow_mut().push((chunk.text_type(), text));
            }
            Directive::Continue
        }));
        rewrite_chunked(
            input.as_bytes(),
            &case.plan,
            &mut builder,
            &Settings::default(),
        )
        .expect("rewrite");
        drop(builder);
        assert_eq!(nodes.into_inner(), expected, "plan {}", case.label);
    }
}

#[test]
fn inserted_text_is_escaped() {
    let mut builder = RewriterBuilder::new();
    builder.on(
        &selector("p"),
        ElementContentHandlers::default().element(|el| {
            el.append("<b>&", ContentType::Text);
            el.prepend("<i>", ContentType::Html);
            el.set_attribute("title", "\"q\"").expect("valid attribute");
            Directive::Continue
        }),
    );
    assert_eq!(
        rewrite("<p>x</p>", &mut builder).unwrap(),
        "<p title=\"&quot;q&quot;\"><i>x&lt;b&gt;&amp;</p>"
    );
}

#[test]
fn removed_elements_drop_their_content_under_every_chunk_plan() {
    let input = "<div><span>42</span></div><h1>Hello <b>there</b><!--c--></h1><h2>Hello2</h2>";
    for case in chunk_plans_from_env(input.as_bytes(), BoundaryPolicy::ByteStream) {
        let mut builder = RewriterBuilder::new();
        builder
            .on(
                &selector("h1"),
                ElementContentHandlers::default().element(|el| {
                    el.remove();
                    Directive::Continue
                }),
            )
            .on(
                &selector("b"),
                ElementContentHandlers::default().element(|el| {
                    el.after("never written", ContentType::Text);
                    Directive::Continue
                }),
            );
        let output = rewrite_chunked(
            input.as_bytes(),
            &case.plan,
            &mut builder,
            &Settings::default(),
        )
        .expect("rewrite");
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "<div><span>42</span></div><h2>Hello2</h2>",
            "plan {}",
            case.label
        );
    }
}

#[test]
fn remove_and_keep_content_unwraps_elements() {
    let mut builder = RewriterBuilder::new();
    builder.on(
        &selector("font"),
        ElementContentHandlers::default().element(|el| {
            el.remove_and_keep_content();
            Directive::Continue
        }),
    );
    assert_eq!(
        rewrite("<p><font color=red>a<font>b</font></font></p>", &mut builder).unwrap(),
        "<p>ab</p>"
    );
}

#[test]
fn replacement_and_inner_content() {
    let mut builder = RewriterBuilder::new();
    builder
        .on(
            &selector("#old"),
            ElementContentHandlers::default().element(|el| {
                el.replace("<new></new>", ContentType::Html);
                Directive::Continue
            }),
        )
        .on(
            &selector("ul"),
            ElementContentHandlers::default().element(|el| {
                el.set_inner_content("<li>only</li>", ContentType::Html);
                Directive::Continue
            }),
        );
    assert_eq!(
        rewrite("<div id=old>a<p>b</p></div><ul><li>1<li>2</ul>", &mut builder).unwrap(),
        "<new></new><ul><li>only</li></ul>"
    );
}

#[test]
fn scoped_text_and_comment_handlers() {
    let seen = RefCell::new(Vec::new());
    let mut builder = RewriterBuilder::new();
    builder.on(
        &selector("article > p"),
        ElementContentHandlers::default()
            .text(|chunk| {
                if !chunk.as_str().is_empty() {
                    seen.borrow_mut().push(chunk.as_str().to_string());
                }
                Directive::Continue
            })
            .comments(|comment| {
                comment.remove();
                Directive::Continue
            }),
    );
    let output = rewrite(
        "<p>out</p><article><p>in<!--x--><em>deep</em></p><div><p>nested</p></div></article>",
        &mut builder,
    )
    .unwrap();
    drop(builder);
    assert_eq!(
        output,
        "<p>out</p><article><p>in<em>deep</em></p><div><p>nested</p></div></article>"
    );
    assert_eq!(seen.into_inner(), vec!["in", "deep"]);
}

#[test]
fn end_tag_handlers_run_for_explicit_end_tags_only() {
    let closed = RefCell::new(Vec::new());
    let closed_ref = &closed;
    let mut builder = RewriterBuilder::new();
    builder.on(
        &selector("li"),
        ElementContentHandlers::default().element(move |el| {
            let id = el.get_attribute("id").unwrap_or_default();
            let closed = closed_ref;
            el.on_end_tag(move |end| {
                end.after("!", ContentType::Html);
                closed.borrow_mut().push(id);
                Directive::Continue
            })
            .expect("li has an end tag");
            Directive::Continue
        }),
    );
    let output = rewrite("<ul><li id=a>1</li><li id=b>2</ul>", &mut builder).unwrap();
    drop(builder);
    assert_eq!(output, "<ul><li id=a>1</li>!<li id=b>2</ul>");
    assert_eq!(closed.into_inner(), vec!["a"]);
}

#[test]
fn user_data_is_shared_between_handlers_of_one_element() {
    let mut builder = RewriterBuilder::new();
    builder
        .on(
            &selector("a"),
            ElementContentHandlers::default().element(|el| {
                el.set_user_data(Box::new(String::from("first")));
                Directive::Continue
            }),
        )
        .on(
            &selector("[href]"),
            ElementContentHandlers::default().element(|el| {
                let note = el
                    .user_data()
                    .and_then(|data| data.downcast_ref::<String>())
                    .cloned()
                    .unwrap_or_default();
                el.set_attribute("data-note", &note).expect("valid attribute");
                Directive::Continue
            }),
        );
    assert_eq!(
        rewrite("<a href=x>x</a>", &mut builder).unwrap(),
        "<a href=x data-note=\"first\">x</a>"
    );
}

#[test]
fn document_handlers_run_before_selector_handlers() {
    let order = RefCell::new(Vec::new());
    let mut builder = RewriterBuilder::new();
    builder
        .on(
            &selector("p"),
            ElementContentHandlers::default().comments(|_| {
                order.borrow_mut().push("selector");
                Directive::Continue
            }),
        )
        .on_document(DocumentContentHandlers::default().comments(|_| {
            order.borrow_mut().push("document");
            Directive::Continue
        }));
    rewrite("<p><!--x--></p>", &mut builder).unwrap();
    drop(builder);
    assert_eq!(order.into_inner(), vec!["document", "selector"]);
}

#[test]
fn doctype_and_document_end() {
    let doctypes = RefCell::new(Vec::new());
    let mut builder = RewriterBuilder::new();
    builder.on_document(
        DocumentContentHandlers::default()
            .doctype(|doctype| {
                doctypes.borrow_mut().push((
                    doctype.name(),
                    doctype.public_id(),
                    doctype.force_quirks(),
                ));
                doctype.after("\n", ContentType::Html);
                Directive::Continue
            })
            .end(|end| {
                end.append("<!-- end -->", ContentType::Html);
                end.append("&", ContentType::Text);
                Directive::Continue
            }),
    );
    assert_eq!(
        rewrite("<!DOCTYPE HTML><!doctype><p>open", &mut builder).unwrap(),
        "<!DOCTYPE HTML>\n<!doctype>\n<p>open<!-- end -->&amp;"
    );
    drop(builder);
    assert_eq!(
        doctypes.into_inner(),
        vec![(Some("html".to_string()), None, false), (None, None, true)]
    );
}

#[test]
fn source_locations_are_offsets_into_the_whole_stream() {
    let input = "<p>ab</p><div id=x>yy</div><!--c-->";
    for case in chunk_plans_from_env(input.as_bytes(), BoundaryPolicy::ByteStream) {
        let elements = RefCell::new(Vec::new());
        let end_tags = RefCell::new(Vec::new());
        let comments = RefCell::new(Vec::new());
        let text = RefCell::new(Vec::<(usize, usize)>::new());
        let elements_ref = &elements;
        let end_tags_ref = &end_tags;
        let mut builder = RewriterBuilder::new();
        builder
            .on_document(
                DocumentContentHandlers::default()
                    .comments(|comment| {
                        let loc = comment.source_location();
                        comments.borrow_mut().push((loc.start, loc.end));
                        Directive::Continue
                    })
                    .text(|chunk| {
                        let loc = chunk.source_location();
                        assert_eq!(loc.len(), chunk.as_str().len());
                        if loc.is_empty() {
                            return Directive::Continue;
                        }
                        let mut ranges = text.borrow_mut();
                        match ranges.last_mut() {
                            Some(last) if last.1 == loc.start => last.1 = loc.end,
                            _ => ranges.push((loc.start, loc.end)),
                        }
                        Directive::Continue
                    }),
            )
            .on(
                &selector("*"),
                ElementContentHandlers::default().element(move |el| {
                    let loc = el.source_location();
                    elements_ref
                        .borrow_mut()
                        .push((el.tag_name(), loc.start, loc.end));
                    el.on_end_tag(move |end| {
                        let loc = end.source_location();
                        end_tags_ref.borrow_mut().push((end.name(), loc.start, loc.end));
                        Directive::Continue
                    })
                    .expect("has an end tag");
                    Directive::Continue
                }),
            );
        let output = rewrite_chunked(
            input.as_bytes(),
            &case.plan,
            &mut builder,
            &Settings::default(),
        )
        .expect("rewrite");
        drop(builder);
        assert_eq!(output, input.as_bytes(), "plan {}", case.label);
        assert_eq!(
            elements.into_inner(),
            vec![("p".to_string(), 0, 3), ("div".to_string(), 9, 19)],
            "plan {}",
            case.label
        );
        assert_eq!(
            end_tags.into_inner(),
            vec![("p".to_string(), 5, 9), ("div".to_string(), 21, 27)],
            "plan {}",
            case.label
        );
        assert_eq!(comments.into_inner(), vec![(27, 35)], "plan {}", case.label);
        assert_eq!(text.into_inner(), vec![(3, 5), (19, 21)], "plan {}", case.label);
    }
}

#[test]
fn streaming_content_is_written_in_place() {
    let mut builder = RewriterBuilder::new();
    builder.on(
        &selector("div"),
        ElementContentHandlers::default().element(|el| {
            el.append_streaming(streaming(|sink| {
                let bytes = "\u{e9}t\u{e9}".as_bytes();
                for byte in bytes {
                    sink.write_utf8_chunk(std::slice::from_ref(byte), ContentType::Text)?;
                }
                sink.write_str("<x>", ContentType::Html)?;
                Ok(())
            }));
            Directive::Continue
        }),
    );
    assert_eq!(
        rewrite("<div>a</div>", &mut builder).unwrap(),
        "<div>a\u{e9}t\u{e9}<x></div>"
    );
}

#[test]
fn failing_streaming_content_faults_the_rewriter() {
    let mut builder = RewriterBuilder::new();
    builder.on(
        &selector("div"),
        ElementContentHandlers::default().element(|el| {
            el.before_streaming(streaming(|sink| {
                sink.write_utf8_chunk(&[0xE2, 0x82], ContentType::Html)?;
                Ok(())
            }));
            Directive::Continue
        }),
    );
    let mut output = Vec::new();
    let mut rewriter = builder
        .build(&Settings::default(), |chunk: &[u8]| output.extend_from_slice(chunk))
        .unwrap();
    let err = rewriter.write(b"<div>").unwrap_err();
    assert!(matches!(err, RewritingError::ContentHandler(_)), "{err:?}");
    assert_eq!(rewriter.state(), RewriterState::Faulted);
}

#[test]
fn stop_poisons_the_rewriter() {
    let mut builder = RewriterBuilder::new();
    builder.on(
        &selector("stop"),
        ElementContentHandlers::default().element(|_| Directive::Stop),
    );
    let mut output = Vec::new();
    let mut rewriter = builder
        .build(&Settings::default(), |chunk: &[u8]| output.extend_from_slice(chunk))
        .unwrap();
    rewriter.write(b"<p>a</p>").unwrap();
    assert!(matches!(
        rewriter.write(b"<stop>"),
        Err(RewritingError::Stopped)
    ));
    assert_eq!(rewriter.state(), RewriterState::Stopped);
    assert!(matches!(rewriter.write(b"x"), Err(RewritingError::Poisoned)));
    assert!(matches!(rewriter.end(), Err(RewritingError::Poisoned)));
    drop(rewriter);
    assert_eq!(output, b"<p>a</p>");
}

#[test]
fn calls_after_end_fail() {
    let chunks = RefCell::new(Vec::new());
    let mut builder = RewriterBuilder::new();
    let mut rewriter = builder
        .build(&Settings::default(), |chunk: &[u8]| {
            chunks.borrow_mut().push(chunk.to_vec())
        })
        .unwrap();
    rewriter.write(b"<p>a").unwrap();
    rewriter.write(b"b</p>").unwrap();
    rewriter.end().unwrap();
    assert_eq!(rewriter.state(), RewriterState::Ended);
    assert!(matches!(rewriter.write(b"x"), Err(RewritingError::Ended)));
    assert!(matches!(rewriter.end(), Err(RewritingError::Ended)));
    drop(rewriter);

    let chunks = chunks.into_inner();
    let (last, rest) = chunks.split_last().unwrap();
    assert!(last.is_empty(), "end finishes with an empty chunk");
    assert!(rest.iter().all(|chunk| !chunk.is_empty()));
    assert_eq!(rest.concat(), b"<p>ab</p>");
}

#[test]
fn memory_limit_covers_buffered_markup() {
    let settings = Settings {
        memory: MemorySettings {
            preallocated_parsing_buffer_size: 0,
            max_allowed_memory_usage: 5,
        },
        ..Settings::default()
    };
    let mut builder = RewriterBuilder::new();
    let mut rewriter = builder.build(&settings, |_: &[u8]| {}).unwrap();
    let err = rewriter.write(b"<span alt='aaaaa").unwrap_err();
    assert!(matches!(err, RewritingError::MemoryLimitExceeded(_)), "{err:?}");
    assert_eq!(rewriter.state(), RewriterState::Faulted);
    assert!(matches!(rewriter.end(), Err(RewritingError::Poisoned)));
}

#[test]
fn memory_limit_covers_pending_content() {
    let settings = Settings {
        memory: MemorySettings {
            preallocated_parsing_buffer_size: 0,
            max_allowed_memory_usage: 4096,
        },
        ..Settings::default()
    };
    let big = "x".repeat(8192);
    let mut builder = RewriterBuilder::new();
    builder.on(
        &selector("div"),
        ElementContentHandlers::default().element(|el| {
            el.append(&big, ContentType::Html);
            Directive::Continue
        }),
    );
    let mut rewriter = builder.build(&settings, |_: &[u8]| {}).unwrap();
    let err = rewriter.write(b"<div>").unwrap_err();
    assert!(matches!(err, RewritingError::MemoryLimitExceeded(_)), "{err:?}");
}

#[test]
fn build_errors_keep_the_registrations() {
    let fired = RefCell::new(0);
    let mut builder = RewriterBuilder::new();
    builder.on(
        &selector("p"),
        ElementContentHandlers::default().element(|_| {
            *fired.borrow_mut() += 1;
            Directive::Continue
        }),
    );

    let bad_label = Settings {
        encoding: "utf-16le",
        ..Settings::default()
    };
    assert!(matches!(
        builder.build(&bad_label, |_: &[u8]| {}),
        Err(BuildError::Encoding(_))
    ));
    let too_much = Settings {
        memory: MemorySettings {
            preallocated_parsing_buffer_size: 10,
            max_allowed_memory_usage: 9,
        },
        ..Settings::default()
    };
    assert!(matches!(
        builder.build(&too_much, |_: &[u8]| {}),
        Err(BuildError::PreallocationExceedsLimit {
            preallocated: 10,
            max: 9
        })
    ));

    let mut rewriter = builder.build(&Settings::default(), |_: &[u8]| {}).unwrap();
    rewriter.write(b"<p><p>").unwrap();
    rewriter.end().unwrap();
    drop(rewriter);
    drop(builder);
    assert_eq!(fired.into_inner(), 2);
}

#[test]
fn strict_mode_refuses_ambiguous_markup() {
    let input = b"<select><xmp><span></span></xmp></select>";
    let mut builder = RewriterBuilder::new();
    let mut rewriter = builder.build(&Settings::default(), |_: &[u8]| {}).unwrap();
    let err = rewriter.write(input).unwrap_err();
    assert!(matches!(err, RewritingError::ParsingAmbiguity(_)), "{err:?}");
    assert_eq!(rewriter.state(), RewriterState::Faulted);

    let lenient = Settings {
        strict: false,
        ..Settings::default()
    };
    let output = rewrite_chunked(input, &ChunkPlan::Whole, &mut RewriterBuilder::new(), &lenient)
        .expect("lenient rewrite");
    assert_eq!(output, input);
}

#[test]
fn non_utf8_documents_are_decoded_and_encoded() {
    let settings = Settings {
        encoding: "windows-1251",
        ..Settings::default()
    };
    // "Привет" in windows-1251.
    let input = b"<p>\xCF\xF0\xE8\xE2\xE5\xF2</p>";
    for case in chunk_plans_from_env(input, BoundaryPolicy::ByteStream) {
        let text = RefCell::new(String::new());
        let mut builder = RewriterBuilder::new();
        builder
            .on_document(DocumentContentHandlers::default().text(|chunk| {
                text.borrow_mut().push_str(chunk.as_str());
                Directive::Continue
            }))
            .on(
                &selector("p"),
                ElementContentHandlers::default().element(|el| {
                    el.set_attribute("title", "\u{416}").expect("encodable");
                    el.append("\u{1F600}", ContentType::Text);
                    Directive::Continue
                }),
            );
        let output = rewrite_chunked(input, &case.plan, &mut builder, &settings).expect("rewrite");
        drop(builder);
        assert_eq!(
            output,
            b"<p title=\"\xC6\">\xCF\xF0\xE8\xE2\xE5\xF2&#128512;</p>",
            "plan {}",
            case.label
        );
        assert_eq!(
            text.into_inner(),
            "\u{41f}\u{440}\u{438}\u{432}\u{435}\u{442}",
            "plan {}",
            case.label
        );
    }
}

#[test]
fn multi_byte_characters_split_across_chunks_are_decoded_once() {
    let settings = Settings {
        encoding: "gbk",
        ..Settings::default()
    };
    // "中文" in GBK, two bytes per character.
    let input = b"<p>\xD6\xD0\xCE\xC4</p>";
    for case in chunk_plans_from_env(input, BoundaryPolicy::ByteStream) {
        let text = RefCell::new(String::new());
        let mut builder = RewriterBuilder::new();
        builder.on(
            &selector("p"),
            ElementContentHandlers::default().text(|chunk| {
                text.borrow_mut().push_str(chunk.as_str());
                Directive::Continue
            }),
        );
        let output = rewrite_chunked(input, &case.plan, &mut builder, &settings).expect("rewrite");
        drop(builder);
        assert_eq!(output, input, "plan {}", case.label);
        assert_eq!(text.into_inner(), "\u{4e2d}\u{6587}", "plan {}", case.label);
    }
}
