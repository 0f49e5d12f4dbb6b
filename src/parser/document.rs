use scraper::{ElementRef, Html, Selector};

/// A parsed game page. Parsing is lenient: unclosed or misnested tags are
/// repaired by html5ever instead of failing.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }

    pub fn select<'a, 'b>(&'a self, selector: &'b Selector) -> impl Iterator<Item = Node<'a>> + 'b
    where
        'a: 'b,
    {
        self.html.select(selector).map(Node)
    }

    pub fn select_first(&self, selector: &Selector) -> Option<Node<'_>> {
        self.html.select(selector).next().map(Node)
    }
}

/// Read-only handle on one element. Children belong to the tree; `parent`
/// and `ancestors` borrow back into it.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Node<'a>(ElementRef<'a>);

impl<'a> Node<'a> {
    pub fn tag(&self) -> &'a str {
        self.0.value().name()
    }

    pub fn id(&self) -> Option<&'a str> {
        self.0.value().attr("id")
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.0.value().classes().any(|c| c == class)
    }

    pub fn parent(&self) -> Option<Node<'a>> {
        self.0.parent().and_then(ElementRef::wrap).map(Node)
    }

    /// Element ancestors, innermost first.
    pub fn ancestors(&self) -> impl Iterator<Item = Node<'a>> {
        self.0.ancestors().filter_map(ElementRef::wrap).map(Node)
    }

    /// Nearest enclosing element satisfying `pred`. Never returns `self`.
    pub fn find_ancestor(&self, pred: impl Fn(&Node<'a>) -> bool) -> Option<Node<'a>> {
        self.ancestors().find(|n| pred(n))
    }

    /// Matching descendants in document order.
    pub fn select<'b>(&self, selector: &'b Selector) -> impl Iterator<Item = Node<'a>> + 'b
    where
        'a: 'b,
    {
        let this = self.0;
        self.0
            .select(selector)
            .filter(move |el| *el != this)
            .map(Node)
    }

    pub fn select_first(&self, selector: &Selector) -> Option<Node<'a>> {
        self.select(selector).next()
    }

    /// Direct element children, skipping text and comment nodes.
    pub fn child_elements(&self) -> impl Iterator<Item = Node<'a>> {
        self.0.children().filter_map(ElementRef::wrap).map(Node)
    }

    /// Text content with text nodes joined by a space and all whitespace
    /// runs collapsed.
    pub fn text(&self) -> String {
        normalize_text(self.0.text())
    }
}

pub fn normalize_text<'s>(parts: impl Iterator<Item = &'s str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
