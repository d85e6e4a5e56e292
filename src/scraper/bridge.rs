//! Host-callable bridge functions
//!
//! These cross the page/host boundary: page-side script calls them by name,
//! payloads travel as JSON. A bridge call never throws into page script:
//! failures are logged host-side and mapped to false/null/the original
//! value.

use crate::browser::{BridgeFn, PageHandle};
use crate::scraper::session::PageSession;
use crate::scraper::Core;
use serde_json::Value;
use std::sync::Arc;

/// Page-side pass that rewrites every `<img>` to its book path
///
/// Each image URL goes through the `keepThisImage` bridge, which persists
/// the cached asset and answers with its output path (or the original URL
/// when the asset cannot be found).
const IMAGE_REWRITE_SCRIPT: &str = r#"(async () => {
    const images = [...document.images];
    await Promise.all(images.map(async el => {
        if (!el.src) {
            return;
        }
        try {
            const abs = new URL(el.src, window.location.href).toString();
            el.src = await window.keepThisImage(abs);
        } catch (err) {
            console.error('Error handling image', err);
        }
    }));
})()"#;

/// Extracts a URL payload sent either as a bare string or `{url}`
fn payload_url(payload: &Value) -> Option<String> {
    payload
        .as_str()
        .map(str::to_string)
        .or_else(|| {
            payload
                .get("url")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
}

/// Registers the formatting bridges on a page, idempotently
pub(crate) async fn register_format_bridges(
    core: &Arc<Core>,
    session: &PageSession,
) -> crate::Result<()> {
    session
        .expose_once("keepResource", keep_resource_bridge(core.clone()))
        .await?;
    session
        .expose_once(
            "frameEvaluate",
            frame_evaluate_bridge(session.page().clone()),
        )
        .await?;
    session
        .expose_once(
            "inlineFrameContents",
            inline_frame_contents_bridge(session.page().clone()),
        )
        .await?;
    Ok(())
}

/// `keepResource(url)`: persists a cached resource and answers with its
/// book path, or `false` when the URL is unknown
fn keep_resource_bridge(core: Arc<Core>) -> BridgeFn {
    Arc::new(move |payload: Value| {
        let core = core.clone();
        Box::pin(async move {
            let Some(url) = payload_url(&payload) else {
                tracing::debug!("keepResource called without url: {}", payload);
                return Value::Bool(false);
            };
            match core.cache.mark_saved(&url) {
                Some(book_path) => Value::String(book_path),
                None => Value::Bool(false),
            }
        })
    })
}

/// `frameEvaluate(framePath, fnSource)`: evaluates a function inside the
/// first sub-frame whose URL contains `framePath`
///
/// The source runs wrapped so the result settles after a paint; any failure
/// answers `null` rather than throwing into page script.
fn frame_evaluate_bridge(page: Arc<dyn PageHandle>) -> BridgeFn {
    Arc::new(move |payload: Value| {
        let page = page.clone();
        Box::pin(async move {
            let frame_path = payload
                .get("framePath")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let fn_source = payload
                .get("fnSource")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if frame_path.is_empty() || fn_source.is_empty() {
                tracing::debug!("frameEvaluate called with incomplete payload");
                return Value::Null;
            }
            let script = format!(
                "(async () => {{\n\
                 const result = await ({})();\n\
                 await new Promise(done => requestAnimationFrame(done));\n\
                 return result;\n\
                 }})()",
                fn_source
            );
            match page.evaluate_in_frame(&frame_path, &script).await {
                Ok(result) => result,
                Err(err) => {
                    tracing::warn!("frameEvaluate failed for {}: {}", frame_path, err);
                    Value::Null
                }
            }
        })
    })
}

/// `inlineFrameContents(framePath, selector)`: replaces an iframe element
/// with the rendered contents of the frame it hosts
///
/// A single `<p>` wrapper around the frame element is unwrapped along with
/// it. Selector defaults to `body`.
fn inline_frame_contents_bridge(page: Arc<dyn PageHandle>) -> BridgeFn {
    Arc::new(move |payload: Value| {
        let page = page.clone();
        Box::pin(async move {
            let frame_path = payload
                .get("framePath")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let selector = payload
                .get("selector")
                .and_then(Value::as_str)
                .unwrap_or("body")
                .to_string();
            if frame_path.is_empty() {
                tracing::debug!("inlineFrameContents called without framePath");
                return Value::Null;
            }

            let read_script = format!(
                "(() => {{\n\
                 const el = document.querySelector({selector});\n\
                 if (!el) {{ throw new Error('Element not found ' + {selector}); }}\n\
                 return el.innerHTML;\n\
                 }})()",
                selector = json_string(&selector),
            );
            let contents = match page.evaluate_in_frame(&frame_path, &read_script).await {
                Ok(Value::String(contents)) => contents,
                Ok(other) => {
                    tracing::warn!(
                        "inlineFrameContents got non-string contents for {}: {}",
                        frame_path,
                        other
                    );
                    return Value::Null;
                }
                Err(err) => {
                    tracing::warn!("inlineFrameContents read failed for {}: {}", frame_path, err);
                    return Value::Null;
                }
            };

            let splice_script = format!(
                "(() => {{\n\
                 let frame = [...document.getElementsByTagName('iframe')]\n\
                 .find(el => el.src && el.src.includes({frame_path}));\n\
                 if (!frame) {{ throw new Error('Frame not found ' + {frame_path}); }}\n\
                 if (frame.parentElement && frame.parentElement.matches('p')) {{\n\
                 frame = frame.parentElement;\n\
                 }}\n\
                 frame.insertAdjacentHTML('beforebegin', {contents});\n\
                 frame.remove();\n\
                 }})()",
                frame_path = json_string(&frame_path),
                contents = json_string(&contents),
            );
            if let Err(err) = page.evaluate(&splice_script).await {
                tracing::warn!("inlineFrameContents splice failed for {}: {}", frame_path, err);
            }
            Value::Null
        })
    })
}

/// Registers `keepThisImage` and runs the page-side image rewrite pass
pub(crate) async fn switch_images_to_local(
    core: &Arc<Core>,
    session: &PageSession,
) -> crate::Result<()> {
    session
        .expose_once(
            "keepThisImage",
            keep_this_image_bridge(core.clone(), session.page().clone()),
        )
        .await?;
    session.page().evaluate(IMAGE_REWRITE_SCRIPT).await?;
    Ok(())
}

/// `keepThisImage(url)`: persists an image asset, forcing a download when
/// the cache has never seen it
///
/// A cache miss triggers an in-page image load so the response collector
/// can capture the bytes; afterwards both the original URL and its
/// files-host variant are checked. When the asset still cannot be found the
/// original URL is returned unchanged (the page keeps its remote
/// reference).
fn keep_this_image_bridge(core: Arc<Core>, page: Arc<dyn PageHandle>) -> BridgeFn {
    Arc::new(move |payload: Value| {
        let core = core.clone();
        let page = page.clone();
        Box::pin(async move {
            let Some(url) = payload_url(&payload) else {
                tracing::debug!("keepThisImage called without url: {}", payload);
                return Value::Null;
            };

            let mut target = url.clone();
            if core.cache.get(&url).is_none() {
                if let Err(err) = page.evaluate(&image_load_script(&url)).await {
                    tracing::error!("Error handling image {}: {}", url, err);
                }

                // not a strong guarantee: the load may have been served from
                // the wiki's file host instead of the page host
                let found = if core.cache.get(&url).is_some() {
                    Some(url.clone())
                } else {
                    files_host_variant(&core, &url)
                        .filter(|alt| core.cache.get(alt).is_some())
                };
                match found {
                    Some(hit) => target = hit,
                    None => {
                        tracing::warn!("No asset found for {}", url);
                        return Value::String(url);
                    }
                }
            }

            match core.cache.mark_saved(&target) {
                Some(book_path) => Value::String(book_path),
                None => Value::String(url),
            }
        })
    })
}

/// Applies the configured files-host rewrite to a URL, if any
fn files_host_variant(core: &Core, url: &str) -> Option<String> {
    let rule = core.options.rewrite.files.as_ref()?;
    let rewritten = url.replacen(&rule.from, &rule.to, 1);
    (rewritten != url).then_some(rewritten)
}

/// In-page forced image load; resolves once the image is decodable
fn image_load_script(url: &str) -> String {
    format!(
        "(src => new Promise((resolve, reject) => {{\n\
         const img = new Image();\n\
         img.onload = () => {{\n\
         if (img.naturalWidth === 0) {{ reject(new Error('Image unreadable')); return; }}\n\
         resolve(true);\n\
         }};\n\
         img.onerror = reject;\n\
         img.src = src;\n\
         }}))({})",
        json_string(url)
    )
}

/// Embeds a string into generated page script as a JSON literal
fn json_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}
