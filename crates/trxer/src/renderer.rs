//! Evaluates a compiled report template against render data.

use crate::context::Context;
use crate::error::{Result, TrxerError};
use crate::functions::ExtensionFunctions;
use crate::template_loader::TemplateLoader;
use crate::value::Value;
use quick_xml::escape::escape;
use std::borrow::Cow;
use std::collections::HashMap;
use trxer_template::ast::{
    Argument, CallExpr, EachBlockNode, Expression, IfBlockNode, IncludeNode, Node, UnlessBlockNode,
};
use trxer_template::Template;

pub struct Renderer<'r, 'a> {
    template_loader: Option<&'r mut TemplateLoader<'a>>,
    functions: &'r dyn ExtensionFunctions,
    escape_output: bool,
}

impl<'r, 'a> Renderer<'r, 'a> {
    pub fn new(
        template_loader: Option<&'r mut TemplateLoader<'a>>,
        functions: &'r dyn ExtensionFunctions,
    ) -> Self {
        Self {
            template_loader,
            functions,
            escape_output: true,
        }
    }

    pub fn render(&mut self, template: &Template, data: Value) -> Result<String> {
        let mut context = Context::new(data)?;
        let mut output = String::new();
        self.render_nodes(template.nodes(), &mut context, &mut output)?;
        Ok(output)
    }

    fn render_nodes(&mut self, nodes: &[Node], context: &mut Context, output: &mut String) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(n) => output.push_str(&n.content),
                Node::Output(n) => {
                    let value = self.evaluate(&n.expr, context)?;
                    let text = value.stringify().map_err(|e| e.located(n.location))?;
                    if self.escape_output {
                        output.push_str(&escape(text.as_str()));
                    } else {
                        output.push_str(&text);
                    }
                }
                Node::IfBlock(n) => self.render_if(n, context, output)?,
                Node::UnlessBlock(n) => self.render_unless(n, context, output)?,
                Node::EachBlock(n) => self.render_each(n, context, output)?,
                Node::UnsecureBlock(n) => {
                    let previous = std::mem::replace(&mut self.escape_output, false);
                    let result = self.render_nodes(&n.nodes, context, output);
                    self.escape_output = previous;
                    result?;
                }
                Node::Include(n) => self.render_include(n, context, output)?,
            }
        }
        Ok(())
    }

    /// Paths borrow from the context; calls produce a fresh string
    fn evaluate<'c>(&self, expr: &Expression, context: &'c Context) -> Result<Cow<'c, Value>> {
        match expr {
            Expression::Path(path) => context
                .resolve(&path.segments, path.location)
                .map(Cow::Borrowed),
            Expression::Call(call) => self.call(call, context).map(|s| Cow::Owned(Value::String(s))),
        }
    }

    fn call(&self, call: &CallExpr, context: &Context) -> Result<String> {
        let expected = self.functions.arity(&call.name).ok_or_else(|| {
            TrxerError::TemplateCompileError {
                message: format!("Unknown function '{}'", call.name),
                location: call.location,
            }
        })?;
        if expected != call.args.len() {
            return Err(TrxerError::TemplateCompileError {
                message: format!(
                    "Function '{}' takes {} argument(s), got {}",
                    call.name,
                    expected,
                    call.args.len()
                ),
                location: call.location,
            });
        }

        let args = call
            .args
            .iter()
            .map(|arg| match arg {
                Argument::Literal(text) => Ok(text.clone()),
                Argument::Path(path) => context
                    .resolve(&path.segments, path.location)?
                    .stringify_argument()
                    .map_err(|e| e.located(path.location)),
            })
            .collect::<Result<Vec<_>>>()?;

        self.functions
            .call(&call.name, &args)
            .map_err(|e| e.located(call.location))
    }

    fn render_if(&mut self, node: &IfBlockNode, context: &mut Context, output: &mut String) -> Result<()> {
        if self.evaluate(&node.condition, context)?.is_truthy() {
            self.render_nodes(&node.then_nodes, context, output)
        } else if let Some(else_nodes) = &node.else_nodes {
            self.render_nodes(else_nodes, context, output)
        } else {
            Ok(())
        }
    }

    fn render_unless(
        &mut self,
        node: &UnlessBlockNode,
        context: &mut Context,
        output: &mut String,
    ) -> Result<()> {
        if self.evaluate(&node.condition, context)?.is_truthy() {
            Ok(())
        } else {
            self.render_nodes(&node.body_nodes, context, output)
        }
    }

    fn render_each(&mut self, node: &EachBlockNode, context: &mut Context, output: &mut String) -> Result<()> {
        let location = node.collection.location;
        let items = match context.resolve(&node.collection.segments, location)? {
            Value::Array(items) => items.clone(),
            Value::Null => Vec::new(),
            other => {
                return Err(TrxerError::TemplateCompileError {
                    message: format!("Expected array for each, got {}", other.type_name()),
                    location,
                })
            }
        };

        for (index, item) in items.into_iter().enumerate() {
            let mut bindings = HashMap::new();
            bindings.insert(node.item_name.clone(), item);
            if let Some(index_name) = &node.index_name {
                bindings.insert(index_name.clone(), Value::Integer(index as i64));
            }

            context.push_scope(bindings, node.location)?;
            let result = self.render_nodes(&node.body_nodes, context, output);
            context.pop_scope();
            result?;
        }
        Ok(())
    }

    fn render_include(&mut self, node: &IncludeNode, context: &mut Context, output: &mut String) -> Result<()> {
        let partial = {
            let loader = self.template_loader.as_mut().ok_or_else(|| {
                TrxerError::TemplateCompileError {
                    message: "Includes are not available without a template loader".to_string(),
                    location: node.location,
                }
            })?;
            loader.load(&node.name).map_err(|e| e.located(node.location))?
        };

        let mut bindings = HashMap::new();
        for (key, path) in &node.args {
            let value = context.resolve(&path.segments, path.location)?.clone();
            bindings.insert(key.clone(), value);
        }

        if let Some(loader) = self.template_loader.as_mut() {
            loader.push_include(&node.name);
        }
        context.push_include_scope(bindings);
        let result = self.render_nodes(partial.nodes(), context, output);
        context.pop_scope();
        if let Some(loader) = self.template_loader.as_mut() {
            loader.pop_include();
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MapAssets;
    use crate::functions::ReportFunctions;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn render(source: &str, data: serde_json::Value) -> Result<String> {
        let template = trxer_template::parse(source)?;
        Renderer::new(None, &ReportFunctions).render(&template, Value::from_json(data)?)
    }

    #[test]
    fn test_output_is_escaped() {
        assert_eq!(
            render("<td>{[ msg ]}</td>", json!({"msg": "a < b & \"c\""})).unwrap(),
            "<td>a &lt; b &amp; &quot;c&quot;</td>"
        );
    }

    #[test]
    fn test_unsecure_block_skips_escaping() {
        assert_eq!(
            render("{[#unsecure]}{[ html ]}{[/unsecure]}{[ html ]}", json!({"html": "<b>"})).unwrap(),
            "<b>&lt;b&gt;"
        );
    }

    #[test]
    fn test_function_call_in_output_and_condition() {
        let source = "{[ stripTypeQualifier(test.className) ]}\
{[#if extractImageUrl(test.stdOut)]} img{[#else]} none{[/if]}";
        let data = json!({"test": {"className": "Ns.Cls, Asm", "stdOut": "saved 'a.png'"}});
        assert_eq!(render(source, data).unwrap(), "Ns.Cls img");
    }

    #[test]
    fn test_string_literal_and_null_arguments() {
        assert_eq!(
            render("[{[ humanizeDuration('00:00:02') ]}][{[ formatDateTime(missing) ]}]", json!({"missing": null}))
                .unwrap(),
            "[2.00 seconds][]"
        );
    }

    #[test]
    fn test_unknown_function_and_arity_errors_carry_location() {
        let err = render("\n  {[ shout(x) ]}", json!({"x": "a"})).unwrap_err();
        assert!(matches!(err, TrxerError::TemplateCompileError { location, .. } if location.line == 2));

        let err = render("{[ humanizeInterval(x) ]}", json!({"x": "a"})).unwrap_err();
        assert!(err.to_string().contains("takes 2 argument(s), got 1"));
    }

    #[test]
    fn test_helper_failures_stay_format_errors() {
        let err = render("{[ humanizeDuration(d) ]}", json!({"d": "soon"})).unwrap_err();
        assert!(matches!(err, TrxerError::FormatError { .. }));
    }

    #[test]
    fn test_each_with_index_and_unless() {
        let source = "{[#each tests as t, i]}{[ i ]}:{[ t ]}{[#unless i]}*{[/unless]} {[/each]}";
        assert_eq!(
            render(source, json!({"tests": ["a", "b"]})).unwrap(),
            "0:a* 1:b "
        );
    }

    #[test]
    fn test_each_shadowing_is_rejected() {
        assert!(render("{[#each tests as tests]}{[/each]}", json!({"tests": ["a"]})).is_err());
    }

    #[test]
    fn test_include_with_arguments() {
        let assets = MapAssets::new().with("partials/_row.html", "<tr><td>{[ row.name ]}</td></tr>");
        let mut loader = TemplateLoader::new(&assets);
        let template = trxer_template::parse("{[#each tests as t]}{[> /row row=t]}{[/each]}").unwrap();
        let data = Value::from_json(json!({"tests": [{"name": "A"}, {"name": "B"}]})).unwrap();
        let out = Renderer::new(Some(&mut loader), &ReportFunctions)
            .render(&template, data)
            .unwrap();
        assert_eq!(out, "<tr><td>A</td></tr><tr><td>B</td></tr>");
    }

    #[test]
    fn test_recursive_include_is_detected() {
        let assets = MapAssets::new().with("partials/_loop.html", "{[> /loop]}");
        let mut loader = TemplateLoader::new(&assets);
        let template = trxer_template::parse("{[> /loop]}").unwrap();
        let err = Renderer::new(Some(&mut loader), &ReportFunctions)
            .render(&template, Value::from_json(json!({})).unwrap())
            .unwrap_err();
        assert!(err.to_string().contains("Circular include"));
    }

    #[test]
    fn test_include_without_loader() {
        assert!(render("{[> /row]}", json!({})).is_err());
    }
}
