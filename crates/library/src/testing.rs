//! Small multistream dumps written to temporary directories.

use offwiki_compress::{BlockRange, Compression, MultistreamWriter};
use offwiki_config::Config;
use offwiki_index::{LoadOptions, OffsetIndex};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;

pub(crate) fn page(title: &str, id: u64, text: &str) -> String {
    format!(
        "<page><title>{title}</title><ns>0</ns><id>{id}</id>\
         <revision><id>{}</id><text xml:space=\"preserve\">{text}</text></revision></page>\n",
        id + 1000
    )
}

/// A fully loaded index holding `titles`, all in one block.
pub(crate) fn index_of(titles: &[&str]) -> Arc<OffsetIndex> {
    let source: String = titles.iter().enumerate().map(|(i, title)| format!("0:{}:{title}\n", i + 1)).collect();
    let index = Arc::new(OffsetIndex::new());
    index.ingest(source.as_bytes(), &LoadOptions::default()).unwrap();
    index
}

pub(crate) struct Dump {
    dir: tempfile::TempDir,
    lines: Vec<String>,
}
impl Dump {
    /// Write each of `blocks` as one bzip2 member, then the index lines
    /// `lines` builds from the resulting block ranges.
    pub(crate) fn with_index(blocks: Vec<String>, lines: impl FnOnce(&[BlockRange]) -> Vec<String>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = MultistreamWriter::new(File::create(dir.path().join("archive.xml.bz2")).unwrap(), Compression::Bzip2);
        let ranges: Vec<BlockRange> = blocks.iter().map(|block| writer.write_block(block.as_bytes()).unwrap()).collect();
        writer.finish().unwrap();
        let lines = lines(&ranges);
        let mut index = File::create(dir.path().join("index.txt")).unwrap();
        for line in &lines {
            writeln!(index, "{line}").unwrap();
        }
        Self { dir, lines }
    }

    /// Cat and Dog share the first block, Elephant has the second.
    pub(crate) fn animals() -> Self {
        let blocks = vec![
            format!("<mediawiki>\n{}{}", page("Cat", 1, "Meow."), page("Dog", 2, "Woof.")),
            format!("{}</mediawiki>\n", page("Elephant", 3, "Trumpet.")),
        ];
        Self::with_index(blocks, |ranges| {
            vec![
                format!("{}:1:Cat", ranges[0].start),
                format!("{}:2:Dog", ranges[0].start),
                format!("{}:3:Elephant", ranges[1].start),
            ]
        })
    }

    /// Moggy redirects to Kitty, which redirects to Cat. Lion redirects to
    /// Big cat through a link written `big_cat`.
    pub(crate) fn redirects() -> Self {
        let blocks = vec![
            format!(
                "<mediawiki>\n{}{}{}",
                page("Cat", 1, "Meow."),
                page("Kitty", 2, "#REDIRECT [[Cat]]"),
                page("Moggy", 3, "#REDIRECT [[Kitty]]")
            ),
            format!("{}{}</mediawiki>\n", page("Big cat", 4, "Roar."), page("Lion", 5, "#redirect [[big_cat]]")),
        ];
        Self::with_index(blocks, |ranges| {
            vec![
                format!("{}:1:Cat", ranges[0].start),
                format!("{}:2:Kitty", ranges[0].start),
                format!("{}:3:Moggy", ranges[0].start),
                format!("{}:4:Big cat", ranges[1].start),
                format!("{}:5:Lion", ranges[1].start),
            ]
        })
    }

    pub(crate) fn archive(&self) -> PathBuf {
        self.dir.path().join("archive.xml.bz2")
    }

    pub(crate) fn index(&self) -> PathBuf {
        self.dir.path().join("index.txt")
    }

    pub(crate) fn index_lines(&self) -> &[String] {
        &self.lines
    }

    /// The index, loaded to completion.
    pub(crate) fn load_index(&self) -> Arc<OffsetIndex> {
        let index = Arc::new(OffsetIndex::new());
        let source = BufReader::new(File::open(self.index()).unwrap());
        index.ingest(source, &LoadOptions::default()).unwrap();
        index
    }

    pub(crate) fn config(&self) -> Config {
        Config { archive: self.archive(), index: self.index(), ..Config::default() }
    }
}
