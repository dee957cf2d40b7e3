use crate::error::Location;

/// Root node representing a parsed template
#[derive(Debug, Clone)]
pub struct Template {
    pub nodes: Vec<Node>,
    pub location: Location,
}

impl Template {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

/// All possible AST node types
#[derive(Debug, Clone)]
pub enum Node {
    Text(TextNode),
    Output(OutputNode),
    IfBlock(IfBlockNode),
    UnlessBlock(UnlessBlockNode),
    EachBlock(EachBlockNode),
    UnsecureBlock(UnsecureBlockNode),
    Include(IncludeNode),
}

/// Raw text content
#[derive(Debug, Clone)]
pub struct TextNode {
    pub content: String,
    pub location: Location,
}

/// Dot-separated path into the render data: `run.times.start`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    pub segments: Vec<String>,
    pub location: Location,
}

/// Argument of a function call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    Path(PathExpr),
    Literal(String),
}

/// Extension function call: `humanizeDuration(result.duration)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallExpr {
    pub name: String,
    pub args: Vec<Argument>,
    pub location: Location,
}

/// Anything that can be evaluated to a value inside a tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Path(PathExpr),
    Call(CallExpr),
}

impl Expression {
    pub fn location(&self) -> Location {
        match self {
            Expression::Path(p) => p.location,
            Expression::Call(c) => c.location,
        }
    }
}

/// Escaped output of an expression: {[ expr ]}
#[derive(Debug, Clone)]
pub struct OutputNode {
    pub expr: Expression,
    pub location: Location,
}

/// Conditional block: {[#if condition]} ... {[#else]} ... {[/if]}
#[derive(Debug, Clone)]
pub struct IfBlockNode {
    pub condition: Expression,
    pub then_nodes: Vec<Node>,
    pub else_nodes: Option<Vec<Node>>,
    pub location: Location,
}

/// Inverse conditional block: {[#unless condition]} ... {[/unless]}
#[derive(Debug, Clone)]
pub struct UnlessBlockNode {
    pub condition: Expression,
    pub body_nodes: Vec<Node>,
    pub location: Location,
}

/// Loop block: {[#each collection as item]} ... {[/each]}
/// or {[#each collection as item, index]} ... {[/each]}
#[derive(Debug, Clone)]
pub struct EachBlockNode {
    pub collection: PathExpr,
    pub item_name: String,
    pub index_name: Option<String>,
    pub body_nodes: Vec<Node>,
    pub location: Location,
}

/// Unsecure block for raw HTML output: {[#unsecure]} ... {[/unsecure]}
#[derive(Debug, Clone)]
pub struct UnsecureBlockNode {
    pub nodes: Vec<Node>,
    pub location: Location,
}

/// Include directive: {[> /path/to/partial key=value]}
#[derive(Debug, Clone)]
pub struct IncludeNode {
    pub name: String,
    pub args: Vec<(String, PathExpr)>,
    pub location: Location,
}
