//! Decides whether the form may be submitted
//!
//! The rules are lopsided on purpose and must stay that way until product
//! intent says otherwise:
//! - a JSON slot on `file` only needs a file, the context slot is not looked at;
//! - an empty context URL passes even under an allow-list, while an empty JSON
//!   URL does not.

use crate::input::{InputSlot, InputSource};
use crate::policy::{AllowPattern, RemoteFetchPolicy};

pub fn can_submit(json: &InputSlot, context: &InputSlot, policy: &RemoteFetchPolicy) -> bool {
    let allow = policy.allow_pattern();

    let json_ok = match json.source {
        InputSource::File => return json.has_file(),
        InputSource::Content => !json.text.trim().is_empty(),
        InputSource::Url => match allow {
            None => true,
            Some(allow) => {
                let url = json.url_str();
                !url.is_empty() && allow.is_match(url)
            }
        },
    };

    json_ok && context_ok(context, allow)
}

fn context_ok(context: &InputSlot, allow: Option<&AllowPattern>) -> bool {
    match (context.source, allow) {
        (InputSource::Url, Some(allow)) => {
            let url = context.url_str();
            url.is_empty() || allow.is_match(url)
        }
        _ => true,
    }
}
