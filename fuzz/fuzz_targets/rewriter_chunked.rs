#![no_main]

use libfuzzer_sys::fuzz_target;
use rewriter::{
    ContentType, Directive, DocumentContentHandlers, ElementContentHandlers, MemorySettings,
    RewriterBuilder, Selector, Settings,
};

// First byte picks the chunk size, the rest is the document. Output must
// match the input whenever no handler mutates anything.
fuzz_target!(|data: &[u8]| {
    let Some((&split, input)) = data.split_first() else {
        return;
    };
    let chunk_size = usize::from(split % 16) + 1;
    let settings = Settings {
        strict: false,
        memory: MemorySettings {
            preallocated_parsing_buffer_size: 0,
            max_allowed_memory_usage: 1 << 20,
        },
        ..Settings::default()
    };

    let mut output = Vec::with_capacity(input.len());
    let mut builder = RewriterBuilder::new();
    builder
        .on_document(DocumentContentHandlers::default().text(|_| Directive::Continue))
        .on(
            &"div > p".parse::<Selector>().expect("selector"),
            ElementContentHandlers::default().element(|el| {
                let _ = el.tag_name();
                Directive::Continue
            }),
        );
    let mut rewriter = builder
        .build(&settings, |chunk: &[u8]| output.extend_from_slice(chunk))
        .expect("build");
    let mut ok = true;
    for chunk in input.chunks(chunk_size) {
        if rewriter.write(chunk).is_err() {
            ok = false;
            break;
        }
    }
    if ok && rewriter.end().is_ok() {
        drop(rewriter);
        assert_eq!(output, input);
    } else {
        drop(rewriter);
    }

    let mut builder = RewriterBuilder::new();
    builder.on(
        &"*".parse::<Selector>().expect("selector"),
        ElementContentHandlers::default()
            .element(|el| {
                el.set_attribute("data-f", "1").ok();
                el.append("&", ContentType::Text);
                if el.tag_name() == "b" {
                    el.remove_and_keep_content();
                }
                Directive::Continue
            })
            .comments(|comment| {
                comment.remove();
                Directive::Continue
            }),
    );
    let mut rewriter = builder.build(&settings, |_: &[u8]| {}).expect("build");
    for chunk in input.chunks(chunk_size) {
        if rewriter.write(chunk).is_err() {
            return;
        }
    }
    let _ = rewriter.end();
});
