use std::env;
use std::path::{Path, PathBuf};

use crate::options::{OptionValue, Options};

/// Typed MeCab configuration.
///
/// Every field maps to one MeCab long option. Unset fields are left to
/// MeCab's own defaults (and to `mecabrc`). Options without a typed field go
/// through [`TaggerConfig::with_option`].
#[derive(Debug, Clone)]
pub struct TaggerConfig {
    /// Explicit `libmecab` path. Defaults to `MECAB_LIBRARY_PATH`.
    pub library_path: Option<PathBuf>,
    /// `--dicdir`: system dictionary directory.
    pub dicdir: Option<PathBuf>,
    /// `--userdic`: user dictionaries, joined with `,`.
    pub userdic: Vec<PathBuf>,
    /// `--rcfile`: resource file.
    pub rcfile: Option<PathBuf>,
    /// `--output-format-type`, e.g. `wakati`, `yomi` or a user-defined type.
    pub output_format_type: Option<String>,
    /// `--node-format`: template for known nodes.
    pub node_format: Option<String>,
    /// `--unk-format`: template for unknown nodes.
    pub unk_format: Option<String>,
    /// `--bos-format`: template for the beginning-of-sentence node.
    pub bos_format: Option<String>,
    /// `--eos-format`: template for the end-of-sentence node.
    pub eos_format: Option<String>,
    /// `--eon-format`: template printed after the last N-best result.
    pub eon_format: Option<String>,
    /// `--unk-feature`: feature string used for unknown words.
    pub unk_feature: Option<String>,
    /// `--input-buffer-size`.
    pub input_buffer_size: Option<u32>,
    /// `--lattice-level`.
    pub lattice_level: Option<u32>,
    /// `--theta`: temperature for soft marginal probabilities.
    pub theta: Option<f32>,
    /// `--cost-factor`.
    pub cost_factor: Option<i32>,
    /// `--max-grouping-size` for unknown words.
    pub max_grouping_size: Option<u32>,
    /// `--nbest`: number of results emitted by string output.
    pub nbest: Option<u32>,
    /// `--all-morphs`.
    pub all_morphs: bool,
    /// `--partial`.
    pub partial: bool,
    /// Additional raw options. Typed fields win over same-named entries.
    pub extra: Options,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            library_path: env::var_os("MECAB_LIBRARY_PATH").map(PathBuf::from),
            dicdir: None,
            userdic: Vec::new(),
            rcfile: None,
            output_format_type: None,
            node_format: None,
            unk_format: None,
            bos_format: None,
            eos_format: None,
            eon_format: None,
            unk_feature: None,
            input_buffer_size: None,
            lattice_level: None,
            theta: None,
            cost_factor: None,
            max_grouping_size: None,
            nbest: None,
            all_morphs: false,
            partial: false,
            extra: Options::new(),
        }
    }
}

impl TaggerConfig {
    /// Sets `library_path`.
    pub fn with_library_path(mut self, library_path: impl AsRef<Path>) -> Self {
        self.library_path = Some(library_path.as_ref().to_path_buf());
        self
    }

    /// Sets `dicdir`.
    pub fn with_dicdir(mut self, dicdir: impl AsRef<Path>) -> Self {
        self.dicdir = Some(dicdir.as_ref().to_path_buf());
        self
    }

    /// Appends one `userdic` entry.
    pub fn add_userdic(mut self, userdic: impl AsRef<Path>) -> Self {
        self.userdic.push(userdic.as_ref().to_path_buf());
        self
    }

    /// Sets `rcfile`.
    pub fn with_rcfile(mut self, rcfile: impl AsRef<Path>) -> Self {
        self.rcfile = Some(rcfile.as_ref().to_path_buf());
        self
    }

    /// Sets `output_format_type`.
    pub fn with_output_format_type(mut self, output_format_type: impl Into<String>) -> Self {
        self.output_format_type = Some(output_format_type.into());
        self
    }

    /// Sets `node_format`.
    pub fn with_node_format(mut self, node_format: impl Into<String>) -> Self {
        self.node_format = Some(node_format.into());
        self
    }

    /// Sets `unk_format`.
    pub fn with_unk_format(mut self, unk_format: impl Into<String>) -> Self {
        self.unk_format = Some(unk_format.into());
        self
    }

    /// Sets `bos_format`.
    pub fn with_bos_format(mut self, bos_format: impl Into<String>) -> Self {
        self.bos_format = Some(bos_format.into());
        self
    }

    /// Sets `eos_format`.
    pub fn with_eos_format(mut self, eos_format: impl Into<String>) -> Self {
        self.eos_format = Some(eos_format.into());
        self
    }

    /// Sets `eon_format`.
    pub fn with_eon_format(mut self, eon_format: impl Into<String>) -> Self {
        self.eon_format = Some(eon_format.into());
        self
    }

    /// Sets `unk_feature`.
    pub fn with_unk_feature(mut self, unk_feature: impl Into<String>) -> Self {
        self.unk_feature = Some(unk_feature.into());
        self
    }

    /// Sets `input_buffer_size`.
    pub fn with_input_buffer_size(mut self, input_buffer_size: u32) -> Self {
        self.input_buffer_size = Some(input_buffer_size);
        self
    }

    /// Sets `lattice_level`.
    pub fn with_lattice_level(mut self, lattice_level: u32) -> Self {
        self.lattice_level = Some(lattice_level);
        self
    }

    /// Sets `theta`.
    pub fn with_theta(mut self, theta: f32) -> Self {
        self.theta = Some(theta);
        self
    }

    /// Sets `cost_factor`.
    pub fn with_cost_factor(mut self, cost_factor: i32) -> Self {
        self.cost_factor = Some(cost_factor);
        self
    }

    /// Sets `max_grouping_size`.
    pub fn with_max_grouping_size(mut self, max_grouping_size: u32) -> Self {
        self.max_grouping_size = Some(max_grouping_size);
        self
    }

    /// Sets `nbest`.
    pub fn with_nbest(mut self, nbest: u32) -> Self {
        self.nbest = Some(nbest);
        self
    }

    /// Sets `all_morphs`.
    pub fn with_all_morphs(mut self, all_morphs: bool) -> Self {
        self.all_morphs = all_morphs;
        self
    }

    /// Sets `partial`.
    pub fn with_partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    /// Adds a raw option that has no typed field.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.extra.insert(key, value);
        self
    }

    /// Lowers the typed fields into a raw option set.
    pub fn to_options(&self) -> Options {
        let mut options = self.extra.clone();

        if let Some(dicdir) = &self.dicdir {
            options.insert("dicdir", dicdir.as_path());
        }
        if !self.userdic.is_empty() {
            let joined = self
                .userdic
                .iter()
                .map(|path| path.to_string_lossy())
                .collect::<Vec<_>>()
                .join(",");
            options.insert("userdic", joined);
        }
        if let Some(rcfile) = &self.rcfile {
            options.insert("rcfile", rcfile.as_path());
        }

        let templates = [
            ("output_format_type", &self.output_format_type),
            ("node_format", &self.node_format),
            ("unk_format", &self.unk_format),
            ("bos_format", &self.bos_format),
            ("eos_format", &self.eos_format),
            ("eon_format", &self.eon_format),
            ("unk_feature", &self.unk_feature),
        ];
        for (key, value) in templates {
            if let Some(value) = value {
                options.insert(key, value.as_str());
            }
        }

        if let Some(value) = self.input_buffer_size {
            options.insert("input_buffer_size", value);
        }
        if let Some(value) = self.lattice_level {
            options.insert("lattice_level", value);
        }
        if let Some(value) = self.theta {
            options.insert("theta", value);
        }
        if let Some(value) = self.cost_factor {
            options.insert("cost_factor", value);
        }
        if let Some(value) = self.max_grouping_size {
            options.insert("max_grouping_size", value);
        }
        if let Some(value) = self.nbest {
            options.insert("nbest", value);
        }
        if self.all_morphs {
            options.insert("all_morphs", true);
        }
        if self.partial {
            options.insert("partial", true);
        }

        options
    }
}

/// Output templates a tagger was configured with.
///
/// Captured at construction and copied into every
/// [`ClonedResult`](crate::ClonedResult), so a clone can be checked against
/// the tagger that renders it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatTemplates {
    /// `--output-format-type`.
    pub output_format_type: Option<String>,
    /// `--node-format`.
    pub node: Option<String>,
    /// `--unk-format`.
    pub unk: Option<String>,
    /// `--bos-format`.
    pub bos: Option<String>,
    /// `--eos-format`.
    pub eos: Option<String>,
    /// `--eon-format`.
    pub eon: Option<String>,
}

impl FormatTemplates {
    pub(crate) fn from_options(options: &Options) -> Self {
        let lookup = |key: &str| options.get(key).map(ToString::to_string);
        Self {
            output_format_type: lookup("output_format_type"),
            node: lookup("node_format"),
            unk: lookup("unk_format"),
            bos: lookup("bos_format"),
            eos: lookup("eos_format"),
            eon: lookup("eon_format"),
        }
    }

    /// Returns whether custom node rendering was requested.
    ///
    /// Any single template switches MeCab to its user writer, with the
    /// built-in lines standing in for the templates left unset.
    pub fn is_custom(&self) -> bool {
        [
            &self.output_format_type,
            &self.node,
            &self.unk,
            &self.bos,
            &self.eos,
            &self.eon,
        ]
        .iter()
        .any(|template| template.is_some())
    }
}
