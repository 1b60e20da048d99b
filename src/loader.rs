use super::*;
use html::ScriptSource;

/// DOM plus pending script work for one fetched document.
#[derive(Debug)]
pub(crate) struct LoadedDocument {
    pub(crate) final_url: Url,
    pub(crate) dom: Dom,
    pub(crate) tasks: ScriptTaskQueue,
}

/// Fetches `request`, following up to `max_redirects` 3xx hops.
///
/// Non-2xx final responses are returned as responses; only transport
/// failures, bad `Location` headers and redirect loops are failures here.
pub(crate) fn fetch_following_redirects(
    fetcher: &dyn ResourceFetcher,
    mut request: WebRequest,
    max_redirects: usize,
    trace: &mut TraceState,
) -> std::result::Result<(Url, WebResponse), FetchFailure> {
    let mut hops = 0;
    loop {
        trace.fetch_line(format!(
            "[fetch] {} {}",
            request.method.as_str(),
            request.url
        ));
        let response = fetcher.fetch(&request).map_err(|err| {
            trace.fetch_line(format!("[fetch] {} failed: {err}", request.url));
            FetchFailure::from(err)
        })?;
        trace.fetch_line(format!(
            "[fetch] {} -> {} {}",
            request.url, response.status_code, response.status_message
        ));
        if !response.is_redirect() {
            return Ok((request.url, response));
        }
        if hops >= max_redirects {
            return Err(FetchFailure::Io {
                message: format!("too many redirects (limit {max_redirects})"),
            });
        }
        hops += 1;
        let location = response.header("location").unwrap_or_default();
        let next = request.url.join(location.trim()).map_err(|err| FetchFailure::Io {
            message: format!("invalid redirect location {location:?}: {err}"),
        })?;
        // 307/308 replay the request; the others continue as GET.
        request = if matches!(response.status_code, 307 | 308) {
            WebRequest {
                url: next,
                ..request
            }
        } else {
            WebRequest::get(next)
        };
    }
}

pub(crate) fn check_status(response: &WebResponse) -> std::result::Result<(), FetchFailure> {
    if response.is_success() {
        return Ok(());
    }
    Err(FetchFailure::Status {
        status_code: response.status_code,
        status_message: response.status_message.clone(),
    })
}

/// Loads a page: fetch, parse, then collect script tasks in document order.
/// No DOM is produced when the page itself cannot be fetched.
pub(crate) fn load_document(
    fetcher: &dyn ResourceFetcher,
    request: WebRequest,
    max_redirects: usize,
    trace: &mut TraceState,
) -> Result<LoadedDocument> {
    let requested = request.url.clone();
    let (final_url, response) = fetch_following_redirects(fetcher, request, max_redirects, trace)
        .map_err(|failure| LoadError::new(&requested, failure))?;
    check_status(&response).map_err(|failure| LoadError::new(&final_url, failure))?;

    let parsed = html::parse_html(&response.body)?;
    let mut tasks = ScriptTaskQueue::new();
    for script in parsed.scripts {
        match script.source {
            ScriptSource::Inline(source) => tasks.push(ScriptTask::Inline { source }),
            ScriptSource::External(raw) => match resolve_script_src(&final_url, &raw) {
                Some(url) => tasks.push(ScriptTask::External { url }),
                None => trace.line(format!(
                    "[script] skipping script reference {raw:?}: not a valid url"
                )),
            },
        }
    }
    if let Some(handler_source) = parsed
        .dom
        .body()
        .and_then(|body| parsed.dom.attr(body, "onload"))
    {
        tasks.push(ScriptTask::OnLoad { handler_source });
    }
    trace.lifecycle_line(format!(
        "[lifecycle] loaded {final_url}: {} script task(s)",
        tasks.len()
    ));
    Ok(LoadedDocument {
        final_url,
        dom: parsed.dom,
        tasks,
    })
}

fn resolve_script_src(page_url: &Url, raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let url = page_url.join(raw).ok()?;
    // `//:` and friends parse as special-scheme URLs without a host.
    if url.cannot_be_a_base() || (url.scheme().starts_with("http") && url.host_str().is_none()) {
        return None;
    }
    Some(url)
}
