use std::{env, fs, path::PathBuf};

use proc_macro2::Span;
use toml_edit::{DocumentMut, Item};

const FACADE: &str = "gates";
const PREFIX: &str = "gates_";
const SECTIONS: [&str; 2] = ["dependencies", "dev-dependencies"];

/// The manifest of the crate a derive is expanded in.
pub struct Manifest {
  doc: DocumentMut,
}

impl Manifest {
  /// Reads the `Cargo.toml` next to `CARGO_MANIFEST_DIR`.
  pub fn load() -> Result<Self, String> {
    let dir = env::var_os("CARGO_MANIFEST_DIR").ok_or("CARGO_MANIFEST_DIR is not set")?;
    let path = PathBuf::from(dir).join("Cargo.toml");
    let text = fs::read_to_string(&path)
      .map_err(|err| format!("Unable to read {}: {}", path.display(), err))?;
    Self::parse(&text).map_err(|err| format!("{}: {}", path.display(), err))
  }

  pub fn parse(text: &str) -> Result<Self, String> {
    let doc = text
      .parse::<DocumentMut>()
      .map_err(|err| format!("Invalid manifest: {}", err))?;
    Ok(Self { doc })
  }

  /// Path to the `gates_*` crate `package`, as seen from the manifest's crate.
  ///
  /// A direct dependency (possibly renamed) wins over the facade, where
  /// `gates_ecs` is reachable as `gates::ecs`. Without either the bare package
  /// name is used, which is what the crate itself sees after
  /// `use crate as gates_ecs;`.
  pub fn crate_path(&self, package: &str) -> syn::Path {
    self
      .find(package)
      .unwrap_or_else(|| ident(package).into())
  }

  fn find(&self, package: &str) -> Option<syn::Path> {
    let sections = SECTIONS
      .iter()
      .filter_map(|section| self.doc.get(section))
      .collect::<Vec<_>>();

    if let Some(name) = sections.iter().find_map(|deps| local_name(deps, package)) {
      return Some(ident(&name).into());
    }

    let facade = sections.iter().find_map(|deps| local_name(deps, FACADE))?;
    let mut path: syn::Path = ident(&facade).into();
    if let Some(module) = package.strip_prefix(PREFIX) {
      path.segments.push(ident(module).into());
    }
    Some(path)
  }
}

/// Key under which `package` is declared in a dependency table.
fn local_name(deps: &Item, package: &str) -> Option<String> {
  deps.as_table_like()?.iter().find_map(|(key, dep)| {
    let renamed = dep.get("package").and_then(Item::as_str);
    (renamed.unwrap_or(key) == package).then(|| key.replace('-', "_"))
  })
}

fn ident(name: &str) -> syn::Ident {
  syn::Ident::new(name, Span::call_site())
}
