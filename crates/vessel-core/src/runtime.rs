use semver::{Comparator, Op, Version, VersionReq};

/// Node.js majors the platform can run, oldest first.
pub const SUPPORTED_NODE_MAJORS: &[u64] = &[18, 20, 22];

/// Function runtime selected for the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRuntime {
    pub major: u64,
}

impl NodeRuntime {
    /// Select the newest supported major satisfying `engines.node`.
    ///
    /// Without a declared range the newest supported major is used.
    pub fn resolve(engine: Option<&str>) -> crate::Result<Self> {
        let newest = SUPPORTED_NODE_MAJORS.iter().copied().max().unwrap_or(22);
        let Some(range) = engine.map(str::trim).filter(|r| !r.is_empty()) else {
            return Ok(Self { major: newest });
        };

        let alternatives = parse_range(range)?;
        SUPPORTED_NODE_MAJORS
            .iter()
            .rev()
            .copied()
            .find(|&major| alternatives.iter().any(|req| admits_major(req, major)))
            .map(|major| Self { major })
            .ok_or_else(|| crate::Error::UnsupportedNodeVersion {
                range: range.to_owned(),
                supported: SUPPORTED_NODE_MAJORS.to_vec(),
            })
    }

    /// Platform runtime identifier, e.g. `nodejs20.x`.
    pub fn identifier(&self) -> String {
        format!("nodejs{}.x", self.major)
    }
}

/// Parses an npm-style range into its `||` alternatives.
///
/// npm separates comparators with whitespace where semver expects commas,
/// so `>= 18 <21` becomes `>=18, <21`.
fn parse_range(range: &str) -> crate::Result<Vec<VersionReq>> {
    range
        .split("||")
        .map(|alternative| {
            VersionReq::parse(&to_semver_syntax(alternative)).map_err(|e| {
                crate::Error::InvalidNodeEngine {
                    range: range.to_owned(),
                    source: e,
                }
            })
        })
        .collect()
}

fn to_semver_syntax(alternative: &str) -> String {
    let tokens: Vec<&str> = alternative.split_whitespace().collect();
    let mut comparators: Vec<String> = Vec::new();
    let mut pending_op = String::new();
    let mut i = 0;
    while i < tokens.len() {
        // Hyphen range: `A - B` is `>=A <=B`.
        if pending_op.is_empty() && tokens.get(i + 1) == Some(&"-") && i + 2 < tokens.len() {
            comparators.push(format!(">={}", tokens[i]));
            comparators.push(format!("<={}", tokens[i + 2]));
            i += 3;
            continue;
        }
        let token = tokens[i];
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
            pending_op.push_str(token);
        } else {
            comparators.push(format!("{pending_op}{token}"));
            pending_op.clear();
        }
        i += 1;
    }
    comparators.join(", ")
}

/// Whether any version of `major` satisfies every comparator of `req`.
///
/// Each comparator is reduced to a `[low, high)` interval over release
/// versions and the intersection is checked against `[major.0.0, major+1.0.0)`.
fn admits_major(req: &VersionReq, major: u64) -> bool {
    let mut low = Version::new(major, 0, 0);
    let mut high = Version::new(major + 1, 0, 0);
    for comparator in &req.comparators {
        let (c_low, c_high) = interval(comparator);
        low = low.max(c_low);
        if let Some(c_high) = c_high {
            high = high.min(c_high);
        }
    }
    low < high
}

fn interval(c: &Comparator) -> (Version, Option<Version>) {
    let floor = Version::new(c.major, c.minor.unwrap_or(0), c.patch.unwrap_or(0));
    // First version past the precision the comparator was written with.
    let past = match (c.minor, c.patch) {
        (Some(minor), Some(patch)) => Version::new(c.major, minor, patch + 1),
        (Some(minor), None) => Version::new(c.major, minor + 1, 0),
        (None, _) => Version::new(c.major + 1, 0, 0),
    };
    let zero = Version::new(0, 0, 0);
    match c.op {
        Op::Exact | Op::Wildcard => (floor, Some(past)),
        Op::Greater => (past, None),
        Op::GreaterEq => (floor, None),
        Op::Less => (zero, Some(floor)),
        Op::LessEq => (zero, Some(past)),
        Op::Tilde => {
            let high = match c.minor {
                Some(minor) => Version::new(c.major, minor + 1, 0),
                None => Version::new(c.major + 1, 0, 0),
            };
            (floor, Some(high))
        }
        Op::Caret => {
            let high = match (c.major, c.minor, c.patch) {
                (0, Some(0), Some(patch)) => Version::new(0, 0, patch + 1),
                (0, Some(minor), _) => Version::new(0, minor + 1, 0),
                (major, _, _) => Version::new(major + 1, 0, 0),
            };
            (floor, Some(high))
        }
        _ => (zero, None),
    }
}
