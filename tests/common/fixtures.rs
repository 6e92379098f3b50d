//! Synthetic stacks

use hooktrace::{FixedFrameSource, RawFrame};
use serde_json::json;

/// Three frames, innermost first, with an `apply_filters` call in the middle
pub const THREE_DEEP_JSON: &str = r#"[
    {"file": "/srv/site/plugins/seo/meta.rs", "line": 41, "function": "title_tag", "owner_type": "SeoPlugin", "operator": "->", "args": ["<title>"]},
    {"file": "/srv/site/core/hooks.rs", "line": 307, "function": "apply_filters", "args": ["my_filter", 42]},
    {"file": "/srv/site/index.rs", "line": 17, "function": "main", "args": []}
]"#;

pub fn three_deep_stack() -> FixedFrameSource {
    FixedFrameSource::from_json(THREE_DEEP_JSON).expect("fixture should parse")
}

/// `count` frames named `f0` (innermost) through `f{count - 1}`
pub fn numbered_stack(count: usize) -> FixedFrameSource {
    FixedFrameSource::new(
        (0..count)
            .map(|i| {
                RawFrame::new(format!("f{i}"))
                    .at("numbered.rs", i as u32 + 1)
                    .with_args(vec![json!(i)])
            })
            .collect(),
    )
}
