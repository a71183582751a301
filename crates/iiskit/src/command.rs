//! Command line construction for appcmd and netsh.
//!
//! Every command the crate runs is built here. The text is reproduced
//! exactly as appcmd expects it; values that would end a quoted argument
//! early are rejected instead of escaped, since cmd.exe has no reliable
//! escape for a quote inside a quoted argument.

use crate::error::{Error, Result};
use crate::types::ResourceType;

/// Default location of appcmd.exe.
pub const DEFAULT_APPCMD: &str = r"%windir%\system32\inetsrv\appcmd.exe";

/// Application id registered with `netsh http add sslcert`.
pub const SSL_APP_ID: &str = "{ab3c58f7-8316-42e3-bc6e-771d4ce4b201}";

/// Builds administrative command lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBuilder {
    appcmd: String,
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_APPCMD)
    }
}

impl CommandBuilder {
    /// Create a builder that invokes appcmd at the given path.
    pub fn new(appcmd: impl Into<String>) -> Self {
        Self {
            appcmd: appcmd.into(),
        }
    }

    /// The appcmd executable this builder targets.
    pub fn appcmd(&self) -> &str {
        &self.appcmd
    }

    /// `list <type> /xml`
    pub fn list(&self, resource_type: ResourceType) -> String {
        format!("{} list {} /xml", self.appcmd, resource_type.noun())
    }

    /// `add apppool /name:"<n>" /managedRuntimeVersion:"<v>"`
    pub fn add_apppool(&self, name: &str, runtime_version: &str) -> Result<String> {
        Ok(format!(
            "{} add apppool /name:{} /managedRuntimeVersion:{}",
            self.appcmd,
            quote("pool", name)?,
            quote("managed runtime version", runtime_version)?
        ))
    }

    /// `add site /name:"<n>" [/bindings:<b>]`
    pub fn add_site(&self, name: &str, binding: Option<&str>) -> Result<String> {
        let mut cmd = format!("{} add site /name:{}", self.appcmd, quote("site", name)?);
        if let Some(binding) = binding {
            cmd.push_str(" /bindings:");
            cmd.push_str(bare("binding", binding)?);
        }
        Ok(cmd)
    }

    /// `add app /site.name:"<s>" /path:"/<p>/" /physicalPath:"<pp>" /applicationPool:"<pool>"`
    pub fn add_app(
        &self,
        site: &str,
        path: &str,
        physical_path: &str,
        pool: &str,
    ) -> Result<String> {
        Ok(format!(
            "{} add app /site.name:{} /path:{} /physicalPath:{} /applicationPool:{}",
            self.appcmd,
            quote("site", site)?,
            quote("path", &app_path(path))?,
            quote("physical path", physical_path)?,
            quote("pool", pool)?
        ))
    }

    /// `set vdir "<site>/<path>/" -physicalPath:"<pp>"`
    pub fn set_vdir(&self, site: &str, path: &str, physical_path: &str) -> Result<String> {
        let vdir = format!("{site}{}", app_path(path));
        Ok(format!(
            "{} set vdir {} -physicalPath:{}",
            self.appcmd,
            quote("site", &vdir)?,
            quote("physical path", physical_path)?
        ))
    }

    /// `netsh http add sslcert ipport=0.0.0.0:<port> certhash=<cert> appid={...}`
    pub fn add_sslcert(&self, port: u16, cert: &str) -> Result<String> {
        Ok(format!(
            "netsh http add sslcert ipport=0.0.0.0:{port} certhash={} appid={SSL_APP_ID}",
            bare("cert", cert)?
        ))
    }
}

/// Render a virtual path the way appcmd's `/path:` expects it.
///
/// `blog` and `/blog` both give `/blog/`; the root gives `/`.
pub fn app_path(path: &str) -> String {
    let segment = path.trim_matches('/');
    if segment.is_empty() {
        "/".to_string()
    } else {
        format!("/{segment}/")
    }
}

/// Wrap a value in double quotes for cmd.exe.
pub fn quote(field: &'static str, value: &str) -> Result<String> {
    if value.contains('"') {
        return Err(Error::invalid(field, value, "must not contain a double quote"));
    }
    if value.contains(['\r', '\n']) {
        return Err(Error::invalid(field, value, "must not contain a line break"));
    }
    Ok(format!("\"{value}\""))
}

/// Check a value that is placed on the command line unquoted.
fn bare<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
    if value.is_empty() {
        return Err(Error::invalid(field, value, "must not be empty"));
    }
    if let Some(c) = value
        .chars()
        .find(|c| c.is_whitespace() || matches!(c, '"' | '&' | '|' | '<' | '>' | '^'))
    {
        return Err(Error::invalid(
            field,
            value,
            format!("must not contain {c:?}"),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> CommandBuilder {
        CommandBuilder::default()
    }

    #[test]
    fn test_list() {
        assert_eq!(
            builder().list(ResourceType::AppPool),
            r"%windir%\system32\inetsrv\appcmd.exe list apppool /xml"
        );
        assert_eq!(
            CommandBuilder::new("appcmd").list(ResourceType::Site),
            "appcmd list site /xml"
        );
    }

    #[test]
    fn test_add_apppool() {
        let cmd = CommandBuilder::new("appcmd")
            .add_apppool("_blog", "v4.0")
            .unwrap();
        assert_eq!(
            cmd,
            r#"appcmd add apppool /name:"_blog" /managedRuntimeVersion:"v4.0""#
        );
    }

    #[test]
    fn test_add_site() {
        let b = CommandBuilder::new("appcmd");
        assert_eq!(
            b.add_site("Shop", Some("https://*:443/")).unwrap(),
            r#"appcmd add site /name:"Shop" /bindings:https://*:443/"#
        );
        assert_eq!(
            b.add_site("Shop", None).unwrap(),
            r#"appcmd add site /name:"Shop""#
        );
    }

    #[test]
    fn test_add_app() {
        let cmd = CommandBuilder::new("appcmd")
            .add_app("Default Web Site", "blog", r"C:\sites\blog", "blog")
            .unwrap();
        assert_eq!(
            cmd,
            r#"appcmd add app /site.name:"Default Web Site" /path:"/blog/" /physicalPath:"C:\sites\blog" /applicationPool:"blog""#
        );
    }

    #[test]
    fn test_add_root_app() {
        let cmd = CommandBuilder::new("appcmd")
            .add_app("Shop", "/", r"C:\shop", "_")
            .unwrap();
        assert!(cmd.contains(r#"/path:"/" "#), "{cmd}");
    }

    #[test]
    fn test_set_vdir() {
        let b = CommandBuilder::new("appcmd");
        assert_eq!(
            b.set_vdir("Default Web Site", "blog", r"D:\blog").unwrap(),
            r#"appcmd set vdir "Default Web Site/blog/" -physicalPath:"D:\blog""#
        );
        assert_eq!(
            b.set_vdir("Shop", "/", r"D:\shop").unwrap(),
            r#"appcmd set vdir "Shop/" -physicalPath:"D:\shop""#
        );
    }

    #[test]
    fn test_add_sslcert() {
        let cmd = builder().add_sslcert(443, "0123abcd").unwrap();
        assert_eq!(
            cmd,
            "netsh http add sslcert ipport=0.0.0.0:443 certhash=0123abcd appid={ab3c58f7-8316-42e3-bc6e-771d4ce4b201}"
        );
    }

    #[test]
    fn test_app_path() {
        assert_eq!(app_path("/"), "/");
        assert_eq!(app_path(""), "/");
        assert_eq!(app_path("blog"), "/blog/");
        assert_eq!(app_path("/blog/"), "/blog/");
        assert_eq!(app_path("/foo/bar"), "/foo/bar/");
    }

    #[test]
    fn test_quote_rejects_quotes() {
        let err = builder()
            .add_site(r#"evil" /bindings:http://*:81"#, None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { field: "site", .. }));
    }

    #[test]
    fn test_quote_rejects_line_breaks() {
        assert!(quote("pool", "a\nb").is_err());
        assert_eq!(quote("pool", "a & b").unwrap(), "\"a & b\"");
    }

    #[test]
    fn test_bare_rejects_metacharacters() {
        let b = builder();
        assert!(b.add_site("Shop", Some("http://*:80 & del")).is_err());
        assert!(b.add_sslcert(443, "ab|cd").is_err());
        assert!(b.add_sslcert(443, "").is_err());
    }
}
