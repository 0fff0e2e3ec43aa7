//! Projects: the unit of model coherence.
//!
//! A [`Project`] owns the files under one root, the assembled
//! [`ValidatedResult<Model>`], and a [`RebuildIndex`] that makes incremental
//! re-assembly possible. The index records, per file, the shapes it defines,
//! the cross-file `apply` edges, and the array-valued metadata keys it
//! contributed to; an edit then only re-assembles the file's co-dependent
//! closure, seeding the assembler with the rest of the previous model.

pub mod config;
pub mod file;
pub mod loader;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use smithy_model::{Model, ModelAssembler, Node, NodeValue, ShapeId, ValidatedResult};
use tokio_util::sync::CancellationToken;

pub use config::{ConfigError, MavenConfig, ProjectConfig};
pub use file::{BuildFile, BuildFileKind, IdlFile, ProjectFile};
pub use loader::ProjectLoader;

use crate::document::Document;

/// How a project came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectType {
    /// Driven by build files under its root.
    Normal,
    /// Synthetic single-file project for an open file outside any project.
    Detached,
    /// A recognised root with no config at all.
    Empty,
    /// A build file opened before its root was recognised.
    Unresolved,
}

#[derive(Debug)]
pub struct Project {
    pub(crate) root: PathBuf,
    pub(crate) project_type: ProjectType,
    pub(crate) config: ProjectConfig,
    pub(crate) config_errors: Vec<ConfigError>,
    pub(crate) files: HashMap<PathBuf, ProjectFile>,
    pub(crate) model_result: ValidatedResult<Model>,
    pub(crate) rebuild_index: RebuildIndex,
    /// Bumped on every committed rebuild. Plans capture it so results
    /// computed against an older model are refused at commit time.
    pub(crate) generation: u64,
}

impl Project {
    /// A recognised root with no build files.
    #[must_use]
    pub fn empty(root: PathBuf) -> Self {
        Self {
            root,
            project_type: ProjectType::Empty,
            config: ProjectConfig::empty(),
            config_errors: Vec::new(),
            files: HashMap::new(),
            model_result: ValidatedResult::default(),
            rebuild_index: RebuildIndex::default(),
            generation: 0,
        }
    }

    /// A project holding one build file whose root has not been recognised
    /// yet. Promoted to [`ProjectType::Normal`] by the next reload.
    #[must_use]
    pub fn unresolved(root: PathBuf, build_file: BuildFile) -> Self {
        let mut files = HashMap::new();
        files.insert(
            build_file.path().to_path_buf(),
            ProjectFile::Build(build_file),
        );
        Self {
            root,
            project_type: ProjectType::Unresolved,
            config: ProjectConfig::empty(),
            config_errors: Vec::new(),
            files,
            model_result: ValidatedResult::default(),
            rebuild_index: RebuildIndex::default(),
            generation: 0,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn project_type(&self) -> ProjectType {
        self.project_type
    }

    #[must_use]
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    #[must_use]
    pub fn config_errors(&self) -> &[ConfigError] {
        &self.config_errors
    }

    #[must_use]
    pub fn model_result(&self) -> &ValidatedResult<Model> {
        &self.model_result
    }

    #[must_use]
    pub fn rebuild_index(&self) -> &RebuildIndex {
        &self.rebuild_index
    }

    /// The model generation, incremented by every committed rebuild.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn get_file(&self, path: &Path) -> Option<&ProjectFile> {
        self.files.get(path)
    }

    pub fn get_file_mut(&mut self, path: &Path) -> Option<&mut ProjectFile> {
        self.files.get_mut(path)
    }

    pub fn files(&self) -> impl Iterator<Item = &ProjectFile> {
        self.files.values()
    }

    /// Paths of the model (non-build) files in this project.
    pub fn model_file_paths(&self) -> impl Iterator<Item = &Path> {
        self.files
            .values()
            .filter(|file| !file.is_build())
            .map(ProjectFile::path)
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    /// Re-assemble after an in-place edit to one model file, processing only
    /// its co-dependent closure and skipping the validation pass.
    pub fn update_model_without_validating(&mut self, path: &Path) {
        let Some(plan) = self.file_update_plan(path) else {
            return;
        };
        if let Some(result) = plan.assemble(&CancellationToken::new()) {
            self.apply_rebuild(result);
        }
    }

    /// Full re-assembly of every file, with validation. The `didSave` path.
    pub fn validate_model(&mut self) {
        let plan = self.full_plan(true);
        if let Some(result) = plan.assemble(&CancellationToken::new()) {
            self.apply_rebuild(result);
        }
    }

    /// Drop a file and incrementally rebuild the dependent set it leaves
    /// behind.
    pub fn remove_file(&mut self, path: &Path) {
        if self.files.remove(path).is_none() {
            return;
        }
        let mut pruned = self.rebuild_index.dependent_closure(path);
        pruned.insert(path.to_path_buf());
        let rebuilt: HashSet<PathBuf> = pruned
            .iter()
            .filter(|p| self.files.contains_key(p.as_path()))
            .cloned()
            .collect();
        let plan = self.plan_for(&pruned, rebuilt, false);
        if let Some(result) = plan.assemble(&CancellationToken::new()) {
            self.apply_rebuild(result);
        }
    }

    /// The plan for an in-place update of `path`, or `None` when the path is
    /// not a model file of this project.
    #[must_use]
    pub fn file_update_plan(&self, path: &Path) -> Option<RebuildPlan> {
        let file = self.files.get(path)?;
        if file.is_build() {
            return None;
        }
        let mut affected = self.rebuild_index.dependent_closure(path);
        affected.insert(path.to_path_buf());
        let rebuilt: HashSet<PathBuf> = affected
            .iter()
            .filter(|p| self.files.contains_key(p.as_path()))
            .cloned()
            .collect();
        Some(self.plan_for(&affected, rebuilt, false))
    }

    /// The plan for a full re-assembly of every model file.
    #[must_use]
    pub fn full_plan(&self, validate: bool) -> RebuildPlan {
        let all: HashSet<PathBuf> = self.model_file_paths().map(Path::to_path_buf).collect();
        let mut plan = self.plan_for(&all, all.clone(), validate);
        plan.carry_over = None;
        plan
    }

    /// Commit a completed rebuild: replace the model result, recompute the
    /// index, and move to the next generation. The single mutation point
    /// for background tasks.
    pub fn apply_rebuild(&mut self, result: ValidatedResult<Model>) {
        self.rebuild_index = RebuildIndex::create(&result);
        self.model_result = result;
        self.generation += 1;
    }

    fn plan_for(
        &self,
        pruned: &HashSet<PathBuf>,
        rebuilt: HashSet<PathBuf>,
        validate: bool,
    ) -> RebuildPlan {
        let (carry_over, rebuilt) = match self.model_result.value() {
            Some(model) => (Some(prune_model(model, pruned)), rebuilt),
            // No previous assembly to carry from; rebuild everything.
            None => (
                None,
                self.model_file_paths().map(Path::to_path_buf).collect(),
            ),
        };

        let mut sources: Vec<PlanSource> = rebuilt
            .into_iter()
            .filter_map(|path| {
                let file = self.files.get(&path)?.as_idl()?;
                Some(PlanSource {
                    json: file.is_json(),
                    text: file.document().copy_text(),
                    path,
                })
            })
            .collect();
        // Assembly order is canonical path order so partial and full builds
        // merge arrays identically.
        sources.sort_by(|a, b| a.path.cmp(&b.path));

        RebuildPlan {
            sources,
            carry_over,
            validate,
            generation: self.generation,
        }
    }
}

#[derive(Debug, Clone)]
struct PlanSource {
    path: PathBuf,
    text: String,
    json: bool,
}

/// An immutable snapshot of everything one rebuild needs. Built under the
/// state lock, assembled off it.
#[derive(Debug, Clone)]
pub struct RebuildPlan {
    sources: Vec<PlanSource>,
    carry_over: Option<Model>,
    validate: bool,
    /// The project generation this plan's carry-over was taken from.
    generation: u64,
}

impl RebuildPlan {
    /// The generation the plan was snapshotted at; results assembled from
    /// it are only valid against that same generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Run assembly, observing `token` between files. Returns `None` when
    /// cancelled; no partial result escapes.
    #[must_use]
    pub fn assemble(&self, token: &CancellationToken) -> Option<ValidatedResult<Model>> {
        if token.is_cancelled() {
            return None;
        }
        let mut assembler = ModelAssembler::new();
        if !self.validate {
            assembler.disable_validation();
        }
        if let Some(carry_over) = &self.carry_over {
            assembler.add_model(carry_over.clone());
        }
        for source in &self.sources {
            if token.is_cancelled() {
                return None;
            }
            let path = source.path.to_string_lossy();
            if source.json {
                assembler.add_json(path, source.text.clone());
            } else {
                assembler.add_idl(path, source.text.clone());
            }
        }
        if token.is_cancelled() {
            return None;
        }
        Some(assembler.assemble())
    }
}

/// The previous model minus everything contributed by `removed` files.
///
/// Shapes defined in a removed file are dropped whole. Traits and metadata
/// sourced from removed files are stripped element-by-element for arrays.
/// Anything with [`SourceLocation::NONE`] stays: it has no file to attach to
/// and must survive rebuilds of its neighbours.
fn prune_model(model: &Model, removed: &HashSet<PathBuf>) -> Model {
    let is_removed =
        |filename: &str| !filename.is_empty() && removed.contains(Path::new(filename));

    let mut pruned = Model::new();
    for (id, shape) in &model.shapes {
        if is_removed(&shape.source.filename) {
            continue;
        }
        let mut kept = shape.clone();
        kept.traits.retain(|_, node| {
            if let NodeValue::Array(elements) = &mut node.value {
                elements.retain(|element| !is_removed(&element.source.filename));
                return !elements.is_empty() || !is_removed(&node.source.filename);
            }
            !is_removed(&node.source.filename)
        });
        pruned.shapes.insert(id.clone(), kept);
    }

    for (key, node) in &model.metadata {
        let mut node = node.clone();
        if let NodeValue::Array(elements) = &mut node.value {
            let had_elements = !elements.is_empty();
            elements.retain(|element| !is_removed(&element.source.filename));
            // All contributions gone, or an empty array from a removed
            // file: the entry is rebuilt from source.
            if elements.is_empty() && (had_elements || is_removed(&node.source.filename)) {
                continue;
            }
        } else if is_removed(&node.source.filename) {
            continue;
        }
        pruned.metadata.push((key.clone(), node));
    }

    pruned
}

/// Precomputed lookup tables for incremental rebuilds.
#[derive(Debug, Default, Clone)]
pub struct RebuildIndex {
    /// File to the shapes defined in it.
    defined_shapes: HashMap<PathBuf, HashSet<ShapeId>>,
    /// Shape to the files carrying `apply`-style contributions to it.
    applied_files: HashMap<ShapeId, HashSet<PathBuf>>,
    /// Undirected co-dependency edges between files.
    file_edges: HashMap<PathBuf, HashSet<PathBuf>>,
    /// File to the array-valued metadata keys it contributed to.
    file_metadata_keys: HashMap<PathBuf, HashSet<String>>,
}

impl RebuildIndex {
    /// Walk a model result and record, for every shape and metadata entry,
    /// its originating files and the cross-file edges between them.
    #[must_use]
    pub fn create(result: &ValidatedResult<Model>) -> Self {
        let mut index = RebuildIndex::default();
        let Some(model) = result.value() else {
            return index;
        };

        for (id, shape) in &model.shapes {
            let defining = source_path(&shape.source.filename);
            if let Some(defining) = &defining {
                index
                    .defined_shapes
                    .entry(defining.clone())
                    .or_default()
                    .insert(id.clone());
            }

            let trait_nodes = shape.traits.values().chain(
                shape
                    .members
                    .iter()
                    .flat_map(|member| member.traits.values()),
            );
            for node in trait_nodes {
                for contributor in contributors(node) {
                    if Some(&contributor) == defining.as_ref() {
                        continue;
                    }
                    index
                        .applied_files
                        .entry(id.clone())
                        .or_default()
                        .insert(contributor.clone());
                    if let Some(defining) = &defining {
                        index.add_edge(contributor, defining.clone());
                    }
                }
            }
        }

        for (key, node) in &model.metadata {
            if !node.is_array() {
                continue;
            }
            let contributors: Vec<PathBuf> = contributors(node).into_iter().collect();
            for contributor in &contributors {
                index
                    .file_metadata_keys
                    .entry(contributor.clone())
                    .or_default()
                    .insert(key.clone());
            }
            // Contributors to the same array key rebuild together.
            if let Some((first, rest)) = contributors.split_first() {
                for other in rest {
                    index.add_edge(first.clone(), other.clone());
                }
            }
        }

        index
    }

    fn add_edge(&mut self, a: PathBuf, b: PathBuf) {
        if a == b {
            return;
        }
        self.file_edges.entry(a.clone()).or_default().insert(b.clone());
        self.file_edges.entry(b).or_default().insert(a);
    }

    /// The set of files co-dependent with `path`, `path` included, computed
    /// with an iterative worklist over the undirected edges.
    #[must_use]
    pub fn dependent_closure(&self, path: &Path) -> HashSet<PathBuf> {
        let mut closure = HashSet::new();
        let mut worklist = vec![path.to_path_buf()];
        while let Some(current) = worklist.pop() {
            if !closure.insert(current.clone()) {
                continue;
            }
            if let Some(neighbours) = self.file_edges.get(&current) {
                for neighbour in neighbours {
                    if !closure.contains(neighbour) {
                        worklist.push(neighbour.clone());
                    }
                }
            }
        }
        closure
    }

    /// Shapes defined in `path`.
    #[must_use]
    pub fn shapes_defined_in(&self, path: &Path) -> Option<&HashSet<ShapeId>> {
        self.defined_shapes.get(path)
    }

    /// Files applying traits to `id` from outside its defining file.
    #[must_use]
    pub fn files_applying_to(&self, id: &ShapeId) -> Option<&HashSet<PathBuf>> {
        self.applied_files.get(id)
    }

    /// Array-valued metadata keys `path` contributed to.
    #[must_use]
    pub fn metadata_keys_of(&self, path: &Path) -> Option<&HashSet<String>> {
        self.file_metadata_keys.get(path)
    }
}

/// The element and top-level source files of a trait or metadata node.
fn contributors(node: &Node) -> HashSet<PathBuf> {
    let mut files = HashSet::new();
    if let Some(path) = source_path(&node.source.filename) {
        files.insert(path);
    }
    if let NodeValue::Array(elements) = &node.value {
        for element in elements {
            if let Some(path) = source_path(&element.source.filename) {
                files.insert(path);
            }
        }
    }
    files
}

fn source_path(filename: &str) -> Option<PathBuf> {
    (!filename.is_empty()).then(|| PathBuf::from(filename))
}

/// Build a detached single-file project around in-memory text.
#[must_use]
pub fn detached(path: PathBuf, text: String) -> Project {
    let root = path
        .parent()
        .map_or_else(|| PathBuf::from("/"), Path::to_path_buf);
    let document = Document::of(text);
    let mut files = HashMap::new();
    files.insert(
        path.clone(),
        ProjectFile::Idl(IdlFile::new(path, document)),
    );

    let mut project = Project {
        root,
        project_type: ProjectType::Detached,
        config: ProjectConfig::empty(),
        config_errors: Vec::new(),
        files,
        model_result: ValidatedResult::default(),
        rebuild_index: RebuildIndex::default(),
        generation: 0,
    };
    let plan = project.full_plan(true);
    if let Some(result) = plan.assemble(&CancellationToken::new()) {
        project.apply_rebuild(result);
    }
    project
}
