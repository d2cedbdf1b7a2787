//! Convention-based candidate derivation for unregistered paths
//!
//! Pure functions mapping a request path to an ordered list of logical module
//! paths. Order is priority: the resolver probes them one by one and the
//! first successful load wins.

use crate::config::RouterConfig;
use crate::path::segments;
use crate::route::RouteParams;

/// One place a page module might live, plus the params that placement implies
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub module_path: String,
    pub params: RouteParams,
}

impl Candidate {
    fn fixed(config: &RouterConfig, relative: &str) -> Self {
        Self {
            module_path: config.module_path(relative),
            params: RouteParams::new(),
        }
    }

    fn dynamic(config: &RouterConfig, relative: &str, params: RouteParams) -> Self {
        Self {
            module_path: config.module_path(relative),
            params,
        }
    }

    /// Parametrized candidates are cached per distinct value combination
    pub fn is_parametrized(&self) -> bool {
        !self.params.is_empty()
    }
}

/// Parameter name for the n-th (0-based) dynamic folder in nested conventions
fn nested_param_name(index: usize) -> String {
    match index {
        0 => "id".to_string(),
        1 => "slug".to_string(),
        n => format!("param{}", n + 1),
    }
}

/// Derives candidates for `path` in priority order
///
/// - `/`: `page`, `index`, `home/page`
/// - `/a`: `a`, `a/page`, `a/index`, `a/a`
/// - `/a/b...`: static folders first (`a/b/page`, `a/b`, `a/b/index`,
///   `(a)/b/page`), then the last segment as `[id]` / `[slug]`, then
///   (3+ segments) the second segment as `[id]`, then (4+ segments) every
///   odd-position segment as a nested dynamic folder
///
/// # Examples
///
/// ```
/// use classroute_router::resolver::discovery::candidates;
/// use classroute_router::RouterConfig;
///
/// let config = RouterConfig::default();
/// let paths: Vec<String> = candidates("/contact", &config)
///     .into_iter()
///     .map(|c| c.module_path)
///     .collect();
/// assert_eq!(
///     paths,
///     vec!["app/contact.js", "app/contact/page.js", "app/contact/index.js", "app/contact/contact.js"]
/// );
/// ```
pub fn candidates(path: &str, config: &RouterConfig) -> Vec<Candidate> {
    let segs = segments(path);

    let mut out = match segs.as_slice() {
        [] => vec![
            Candidate::fixed(config, "page"),
            Candidate::fixed(config, "index"),
            Candidate::fixed(config, "home/page"),
        ],
        [single] => vec![
            Candidate::fixed(config, single),
            Candidate::fixed(config, &format!("{}/page", single)),
            Candidate::fixed(config, &format!("{}/index", single)),
            Candidate::fixed(config, &format!("{}/{}", single, single)),
        ],
        _ => multi_segment(&segs, config),
    };

    // Keep first occurrence of each module path
    let mut seen = std::collections::HashSet::new();
    out.retain(|c| seen.insert(c.module_path.clone()));
    out
}

fn multi_segment(segs: &[&str], config: &RouterConfig) -> Vec<Candidate> {
    let joined = segs.join("/");
    let parent = segs[..segs.len() - 1].join("/");
    let last = segs[segs.len() - 1];
    let rest = segs[1..].join("/");

    let mut out = vec![
        Candidate::fixed(config, &format!("{}/page", joined)),
        Candidate::fixed(config, &joined),
        Candidate::fixed(config, &format!("{}/index", joined)),
        Candidate::fixed(config, &format!("({})/{}/page", segs[0], rest)),
    ];

    for name in ["id", "slug"] {
        out.push(Candidate::dynamic(
            config,
            &format!("{}/[{}]/page", parent, name),
            [(name, last)].into_iter().collect(),
        ));
    }

    if segs.len() >= 3 {
        let tail = segs[2..].join("/");
        out.push(Candidate::dynamic(
            config,
            &format!("{}/[id]/{}/page", segs[0], tail),
            [("id", segs[1])].into_iter().collect(),
        ));
    }

    if segs.len() >= 4 {
        let mut params = RouteParams::new();
        let folders: Vec<String> = segs
            .iter()
            .enumerate()
            .map(|(i, seg)| {
                if i % 2 == 1 {
                    let name = nested_param_name(i / 2);
                    params.insert(name.clone(), *seg);
                    format!("[{}]", name)
                } else {
                    seg.to_string()
                }
            })
            .collect();
        out.push(Candidate::dynamic(
            config,
            &format!("{}/page", folders.join("/")),
            params,
        ));
    }

    out
}
