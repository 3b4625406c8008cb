//! Citation-graph sources.
//!
//! A [`DatasetProvider`] turns a dataset name into a labeled graph. The
//! LINQS reader handles the plain-text distribution of Cora and Citeseer:
//!
//! ```text
//! <root>/<name>/<name>.content   paper_id <TAB> f_1 ... f_d <TAB> class
//! <root>/<name>/<name>.cites     cited_id <TAB> citing_id
//! ```
//!
//! The PubMed-Diabetes release (`*.NODE.paper.tab`, `key=value` features) is
//! a different format and is rejected with a parse error.

use crate::{Error, Result};
use ndarray::Array2;
use planetix_core::{Graph, NodeFeatures};
use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A labeled graph as a provider delivers it.
#[derive(Debug, Clone)]
pub struct CitationGraph {
    pub name: String,
    pub graph: Graph,
    /// One label per node, in `0..num_classes`.
    pub labels: Vec<i64>,
    pub num_classes: usize,
    /// Class names, indexed by label.
    pub class_names: Vec<String>,
    /// Original node identifiers, indexed by node id.
    pub node_ids: Vec<String>,
}

impl CitationGraph {
    /// Nodes per class, indexed by label.
    pub fn class_histogram(&self) -> Vec<usize> {
        let mut counts = vec![0; self.num_classes];
        for &label in &self.labels {
            if let Some(c) = usize::try_from(label).ok().and_then(|l| counts.get_mut(l)) {
                *c += 1;
            }
        }
        counts
    }
}

/// Source of labeled graphs by name.
pub trait DatasetProvider {
    fn load(&self, name: &str) -> Result<CitationGraph>;
}

/// Reads LINQS-format datasets below a root directory.
#[derive(Debug, Clone)]
pub struct LinqsProvider {
    root: PathBuf,
}

impl LinqsProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<root>/<name>/<name>.content`
    pub fn content_path(&self, name: &str) -> PathBuf {
        self.root.join(name).join(format!("{name}.content"))
    }

    /// `<root>/<name>/<name>.cites`
    pub fn cites_path(&self, name: &str) -> PathBuf {
        self.root.join(name).join(format!("{name}.cites"))
    }
}

impl DatasetProvider for LinqsProvider {
    fn load(&self, name: &str) -> Result<CitationGraph> {
        let content_path = self.content_path(name);
        let cites_path = self.cites_path(name);
        for path in [&content_path, &cites_path] {
            if !path.exists() {
                return Err(Error::MissingResource { path: path.clone() });
            }
        }

        let content = parse_content(&content_path, &std::fs::read_to_string(&content_path)?)?;
        let n = content.node_ids.len();
        let index: HashMap<&str, usize> = content
            .node_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let text = std::fs::read_to_string(&cites_path)?;
        let mut pairs = BTreeSet::new();
        let mut skipped = 0usize;
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (Some(cited), Some(citing), None) = (fields.next(), fields.next(), fields.next())
            else {
                return Err(Error::Parse {
                    path: cites_path.clone(),
                    line: lineno + 1,
                    msg: "expected `cited citing`".into(),
                });
            };
            match (index.get(cited), index.get(citing)) {
                (Some(&a), Some(&b)) if a != b => {
                    pairs.insert((a.min(b), a.max(b)));
                }
                (Some(_), Some(_)) => {}
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!(dataset = name, skipped, "citations naming unknown papers skipped");
        }

        let edges = pairs.into_iter().flat_map(|(a, b)| [(a, b), (b, a)]).collect();
        let graph = Graph::new(n, edges, NodeFeatures::Dense(content.features))?;

        Ok(CitationGraph {
            name: name.to_string(),
            graph,
            labels: content.labels,
            num_classes: content.class_names.len(),
            class_names: content.class_names,
            node_ids: content.node_ids,
        })
    }
}

struct Content {
    node_ids: Vec<String>,
    features: Array2<f32>,
    labels: Vec<i64>,
    class_names: Vec<String>,
}

fn parse_content(path: &Path, text: &str) -> Result<Content> {
    let parse_err = |line: usize, msg: String| Error::Parse {
        path: path.to_path_buf(),
        line,
        msg,
    };

    let mut node_ids = Vec::new();
    let mut rows: Vec<f32> = Vec::new();
    let mut classes: Vec<String> = Vec::new();
    let mut width: Option<usize> = None;

    for (lineno, line) in text.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() < 2 {
            return Err(parse_err(lineno + 1, "expected `id features... class`".into()));
        }
        let feats = &fields[1..fields.len() - 1];
        match width {
            None => width = Some(feats.len()),
            Some(w) if w != feats.len() => {
                return Err(parse_err(
                    lineno + 1,
                    format!("expected {w} features, found {}", feats.len()),
                ))
            }
            Some(_) => {}
        }
        for f in feats {
            let v: f32 = f
                .parse()
                .map_err(|_| parse_err(lineno + 1, format!("bad feature value `{f}`")))?;
            rows.push(v);
        }
        node_ids.push(fields[0].to_string());
        classes.push(fields[fields.len() - 1].to_string());
    }

    let width = width.unwrap_or(0);
    let features = Array2::from_shape_vec((node_ids.len(), width), rows)
        .map_err(|e| parse_err(0, e.to_string()))?;

    let class_names: Vec<String> = classes
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let class_index: HashMap<&str, i64> = class_names
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i as i64))
        .collect();
    let labels = classes.iter().map(|c| class_index[c.as_str()]).collect();

    Ok(Content {
        node_ids,
        features,
        labels,
        class_names,
    })
}

/// Write a labeled graph in LINQS format under `<root>/<name>/`.
///
/// Each undirected pair is written once. Categorical features are written as
/// integers and read back as floats.
pub fn write_linqs(root: &Path, data: &CitationGraph) -> Result<()> {
    let dir = root.join(&data.name);
    std::fs::create_dir_all(&dir)?;

    let features = data.graph.node_features().to_dense();
    let mut content = String::new();
    for (i, id) in data.node_ids.iter().enumerate() {
        content.push_str(id);
        for v in features.row(i) {
            let _ = write!(content, "\t{v}");
        }
        let class = usize::try_from(data.labels[i])
            .ok()
            .and_then(|l| data.class_names.get(l))
            .ok_or_else(|| Error::InvalidConfig(format!("label {} has no class name", data.labels[i])))?;
        let _ = writeln!(content, "\t{class}");
    }
    std::fs::write(dir.join(format!("{}.content", data.name)), content)?;

    let mut cites = String::new();
    for (s, d) in data.graph.edges().filter(|(s, d)| s < d) {
        let _ = writeln!(cites, "{}\t{}", data.node_ids[s], data.node_ids[d]);
    }
    std::fs::write(dir.join(format!("{}.cites", data.name)), cites)?;
    Ok(())
}
