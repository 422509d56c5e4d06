//! `.bib` files under `test_fixtures/bibtex`

use std::path::PathBuf;

/// Path of a BibTeX fixture
pub fn bibtex_fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_fixtures")
        .join("bibtex")
        .join(name)
}

/// Contents of a BibTeX fixture
pub fn load_bibtex_fixture(name: &str) -> String {
    let path = bibtex_fixture_path(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("cannot read fixture {}: {}", path.display(), err))
}
