//! The contract compiler: walks an [`ApiDescription`] once and produces one
//! validated [`MethodMetadata`] per method.
//!
//! Compilation is fail-fast: any structural violation aborts the whole
//! description with a [`Error::Contract`], never a partial result.

use crate::api::{ApiDescription, MethodDescription, ParamBinding};
use crate::error::{Error, Result};
use crate::metadata::MethodMetadata;
use crate::request_template::RequestTemplate;
use bytes::Bytes;
use http::Method;
use std::collections::HashSet;

/// Compiles API descriptions into method metadata. The seam exists so
/// alternative declarative forms can plug in their own parsing.
pub trait Contract: Send + Sync {
    fn parse_and_validate(&self, api: &ApiDescription) -> Result<Vec<MethodMetadata>>;
}

/// The default contract for [`ApiDescription`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultContract;

impl Contract for DefaultContract {
    fn parse_and_validate(&self, api: &ApiDescription) -> Result<Vec<MethodMetadata>> {
        if !api.type_params().is_empty() {
            return Err(Error::Contract(format!(
                "parameterized types unsupported: {}",
                api.name()
            )));
        }
        if let Some(parent) = api.parent() {
            if parent.parent().is_some() {
                return Err(Error::Contract(format!(
                    "only single-level inheritance supported: {}",
                    api.name()
                )));
            }
            if !parent.type_params().is_empty() {
                return Err(Error::Contract(format!(
                    "parameterized types unsupported: {}",
                    parent.name()
                )));
            }
        }

        let inherited = api.parent().map(|p| p.methods()).unwrap_or_default();
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for method in inherited.iter().chain(api.methods()) {
            let metadata = parse_method(api, method)?;
            if !seen.insert(metadata.config_key.clone()) {
                return Err(Error::Contract(format!(
                    "overrides unsupported: {}",
                    metadata.config_key
                )));
            }
            result.push(metadata);
        }
        Ok(result)
    }
}

fn parse_method(api: &ApiDescription, method: &MethodDescription) -> Result<MethodMetadata> {
    let mut data = MethodMetadata::new(method.name());
    data.return_kind = method.return_kind();
    data.config_key = config_key(api.name(), method);
    data.param_count = method.params().len();

    if let Some(parent) = api.parent() {
        apply_headers(&mut data.template, parent.headers(), parent.name())?;
    }
    apply_headers(&mut data.template, api.headers(), api.name())?;

    parse_request_line(&mut data, method)?;

    // Method-level headers override class-level headers of the same name.
    apply_headers(&mut data.template, method.headers(), method.name())?;

    if let Some(body) = method.body_decl() {
        if body.is_empty() {
            return Err(Error::Contract(format!(
                "body declaration was empty on method {}",
                method.name()
            )));
        }
        if body.contains('{') {
            data.template.body_template(body);
        } else {
            data.template.body_literal(Bytes::from(body.to_string()));
        }
    }

    for (index, param) in method.params().iter().enumerate() {
        match param.binding() {
            ParamBinding::Named {
                name,
                expander,
                encoded,
            } => {
                if name.is_empty() {
                    return Err(Error::Contract(format!(
                        "named parameter {index} on method {} has an empty name",
                        method.name()
                    )));
                }
                data.index_to_name
                    .entry(index)
                    .or_default()
                    .push(name.clone());
                if let Some(f) = expander {
                    data.index_to_expander.insert(index, *f);
                }
                data.index_to_encoded.insert(index, *encoded);
                if !data.template.has_variable(name) {
                    if data.body_index.is_some() {
                        return Err(Error::Contract(format!(
                            "body parameters cannot be used with form parameters: {}",
                            method.name()
                        )));
                    }
                    data.form_params.push(name.clone());
                }
            }
            ParamBinding::QueryMap { encoded } => {
                if data.query_map_index.is_some() {
                    return Err(Error::Contract(format!(
                        "query map binding present on multiple parameters: {}",
                        method.name()
                    )));
                }
                data.query_map_index = Some(index);
                data.query_map_encoded = *encoded;
            }
            ParamBinding::HeaderMap => {
                if data.header_map_index.is_some() {
                    return Err(Error::Contract(format!(
                        "header map binding present on multiple parameters: {}",
                        method.name()
                    )));
                }
                data.header_map_index = Some(index);
            }
            ParamBinding::Url => {
                if data.url_index.is_some() {
                    return Err(Error::Contract(format!(
                        "method {} has too many URL parameters",
                        method.name()
                    )));
                }
                data.url_index = Some(index);
            }
            ParamBinding::Body => {
                if !data.form_params.is_empty() {
                    return Err(Error::Contract(format!(
                        "body parameters cannot be used with form parameters: {}",
                        method.name()
                    )));
                }
                if data.body_index.is_some() {
                    return Err(Error::Contract(format!(
                        "method {} has too many body parameters",
                        method.name()
                    )));
                }
                data.body_index = Some(index);
                data.body_ty = Some(param.ty().to_string());
            }
        }
    }

    Ok(data)
}

/// `"{Api}#{method}({Ty1},{Ty2})"` — unique per method within a description.
fn config_key(api_name: &str, method: &MethodDescription) -> String {
    let tys: Vec<&str> = method.params().iter().map(|p| p.ty()).collect();
    format!("{}#{}({})", api_name, method.name(), tys.join(","))
}

fn parse_request_line(data: &mut MethodMetadata, method: &MethodDescription) -> Result<()> {
    let line = method.request_line().trim();
    if line.is_empty() {
        return Err(Error::Contract(format!(
            "method {} is not declared with an HTTP verb (ex. GET, POST)",
            method.name()
        )));
    }
    let (verb, path) = match line.split_once(' ') {
        Some((verb, rest)) => (verb, rest.trim_start()),
        None => (line, ""),
    };
    if verb.is_empty() || !verb.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(Error::Contract(format!(
            "request line for method {} must start with an HTTP verb: `{line}`",
            method.name()
        )));
    }
    let verb = Method::from_bytes(verb.as_bytes())
        .map_err(|e| Error::Contract(format!("invalid HTTP verb on method {}: {e}", method.name())))?;
    data.template.method(verb).uri(path);
    data.template.set_decode_slash(method.decode_slash());
    data.template
        .set_collection_format(method.collection_format_value());
    Ok(())
}

/// Applies one level of `"Name: value"` header declarations. Within a level,
/// repeated names accumulate values in order; across levels, a later level
/// replaces all values of the same name.
fn apply_headers(template: &mut RequestTemplate, headers: &[String], owner: &str) -> Result<()> {
    let mut seen: HashSet<String> = HashSet::new();
    for declaration in headers {
        let (name, value) = declaration.split_once(':').ok_or_else(|| {
            Error::Contract(format!(
                "malformed header declaration `{declaration}` on {owner}"
            ))
        })?;
        let name = name.trim();
        let value = value.trim();
        if name.is_empty() {
            return Err(Error::Contract(format!(
                "malformed header declaration `{declaration}` on {owner}"
            )));
        }
        if seen.insert(name.to_ascii_lowercase()) {
            template.header(name, value);
        } else {
            template.append_header(name, value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Param, ReturnKind};

    fn compile(api: &ApiDescription) -> Result<Vec<MethodMetadata>> {
        DefaultContract.parse_and_validate(api)
    }

    fn contributors_api() -> ApiDescription {
        ApiDescription::new("GitHub").method(
            MethodDescription::new("contributors", "GET /repos/{owner}/{repo}/contributors")
                .param(Param::named("owner", "String"))
                .param(Param::named("repo", "String")),
        )
    }

    #[test]
    fn compiles_one_metadata_per_method() {
        let api = contributors_api().method(
            MethodDescription::new("repo", "GET /repos/{owner}/{repo}")
                .param(Param::named("owner", "String"))
                .param(Param::named("repo", "String")),
        );
        let compiled = compile(&api).unwrap();
        assert_eq!(compiled.len(), 2);
        assert_eq!(
            compiled[0].config_key(),
            "GitHub#contributors(String,String)"
        );
        assert_eq!(compiled[1].config_key(), "GitHub#repo(String,String)");
    }

    #[test]
    fn duplicate_config_keys_are_rejected() {
        let api = contributors_api().method(
            MethodDescription::new("contributors", "GET /orgs/{owner}/{repo}/contributors")
                .param(Param::named("owner", "String"))
                .param(Param::named("repo", "String")),
        );
        let err = compile(&api).unwrap_err();
        assert!(err.to_string().contains("overrides unsupported"));
    }

    #[test]
    fn distinct_signatures_under_one_name_compile() {
        let api = contributors_api().method(
            MethodDescription::new("contributors", "GET /repos/{owner}/contributors")
                .param(Param::named("owner", "String")),
        );
        let compiled = compile(&api).unwrap();
        assert_eq!(compiled.len(), 2);
    }

    #[test]
    fn parameterized_descriptions_are_rejected() {
        let api = contributors_api().type_param("T");
        let err = compile(&api).unwrap_err();
        assert!(err.to_string().contains("parameterized types unsupported"));
    }

    #[test]
    fn multi_level_inheritance_is_rejected() {
        let grandparent = ApiDescription::new("Base");
        let parent = ApiDescription::new("Middle").extends(grandparent);
        let api = contributors_api().extends(parent);
        let err = compile(&api).unwrap_err();
        assert!(err
            .to_string()
            .contains("only single-level inheritance supported"));
    }

    #[test]
    fn parent_methods_and_headers_are_inherited() {
        let parent = ApiDescription::new("Base")
            .header("Accept: application/json")
            .method(MethodDescription::new("ping", "GET /ping"));
        let api = contributors_api().extends(parent);
        let compiled = compile(&api).unwrap();
        assert_eq!(compiled.len(), 2);
        assert_eq!(compiled[0].method_name(), "ping");
        assert!(compiled[1].template().has_header("Accept"));
    }

    #[test]
    fn method_headers_override_class_headers_of_same_name() {
        let api = ApiDescription::new("Api")
            .header("Accept: application/json")
            .header("X-Common: yes")
            .method(
                MethodDescription::new("xml", "GET /feed").header("Accept: application/xml"),
            );
        let compiled = compile(&api).unwrap();
        let headers = compiled[0].template().headers();
        let accept = headers.iter().find(|(n, _)| n == "Accept").unwrap();
        assert_eq!(accept.1, vec!["application/xml".to_string()]);
        assert!(compiled[0].template().has_header("X-Common"));
    }

    #[test]
    fn repeated_headers_within_a_level_accumulate() {
        let api = ApiDescription::new("Api").method(
            MethodDescription::new("m", "GET /x")
                .header("X-Tag: one")
                .header("X-Tag: two"),
        );
        let compiled = compile(&api).unwrap();
        let headers = compiled[0].template().headers();
        assert_eq!(
            headers.iter().find(|(n, _)| n == "X-Tag").unwrap().1,
            vec!["one".to_string(), "two".to_string()]
        );
    }

    #[test]
    fn missing_verb_is_a_contract_error() {
        let api = ApiDescription::new("Api").method(MethodDescription::new("m", ""));
        assert!(compile(&api).is_err());

        let api = ApiDescription::new("Api").method(MethodDescription::new("m", "get /x"));
        let err = compile(&api).unwrap_err();
        assert!(err.to_string().contains("HTTP verb"));
    }

    #[test]
    fn body_and_form_params_are_mutually_exclusive() {
        let api = ApiDescription::new("Api").method(
            MethodDescription::new("m", "POST /x")
                .param(Param::named("login", "String"))
                .param(Param::body("User")),
        );
        let err = compile(&api).unwrap_err();
        assert!(err.to_string().contains("form parameters"));

        // Same violation, declaration order reversed.
        let api = ApiDescription::new("Api").method(
            MethodDescription::new("m", "POST /x")
                .param(Param::body("User"))
                .param(Param::named("login", "String")),
        );
        assert!(compile(&api).is_err());
    }

    #[test]
    fn singular_bindings_are_enforced() {
        let api = ApiDescription::new("Api").method(
            MethodDescription::new("m", "GET /x")
                .param(Param::query_map("A"))
                .param(Param::query_map("B")),
        );
        assert!(compile(&api).is_err());

        let api = ApiDescription::new("Api").method(
            MethodDescription::new("m", "POST /x")
                .param(Param::body("A"))
                .param(Param::body("B")),
        );
        assert!(compile(&api).is_err());

        let api = ApiDescription::new("Api").method(
            MethodDescription::new("m", "GET /x")
                .param(Param::url("Url"))
                .param(Param::url("Url")),
        );
        assert!(compile(&api).is_err());
    }

    #[test]
    fn named_params_absent_from_templates_become_form_params() {
        let api = ApiDescription::new("Api").method(
            MethodDescription::new("login", "POST /login")
                .param(Param::named("user", "String"))
                .param(Param::named("password", "String")),
        );
        let compiled = compile(&api).unwrap();
        assert_eq!(compiled[0].form_params(), ["user", "password"]);
    }

    #[test]
    fn template_variables_are_not_form_params() {
        let compiled = compile(&contributors_api()).unwrap();
        assert!(compiled[0].form_params().is_empty());
        assert_eq!(compiled[0].index_to_name()[&0], vec!["owner".to_string()]);
        assert_eq!(compiled[0].index_to_name()[&1], vec!["repo".to_string()]);
    }

    #[test]
    fn body_declaration_selects_literal_or_template() {
        let api = ApiDescription::new("Api")
            .method(
                MethodDescription::new("literal", "POST /x").body("exact payload"),
            )
            .method(
                MethodDescription::new("templated", "POST /x")
                    .body("%7B\"user\": \"{user}\"%7D")
                    .param(Param::named("user", "String")),
            );
        let compiled = compile(&api).unwrap();
        assert!(compiled[0].template().body_bytes().is_some());
        assert!(compiled[1].template().has_body_template());
        // The template variable is filled by the named param, not a form param.
        assert!(compiled[1].form_params().is_empty());
    }

    #[test]
    fn return_kinds_are_carried_through() {
        let api = ApiDescription::new("Api")
            .method(MethodDescription::new("fire", "POST /events").returns(ReturnKind::Unit))
            .method(MethodDescription::new("raw", "GET /blob").returns(ReturnKind::Raw));
        let compiled = compile(&api).unwrap();
        assert_eq!(compiled[0].return_kind(), ReturnKind::Unit);
        assert_eq!(compiled[1].return_kind(), ReturnKind::Raw);
    }
}
