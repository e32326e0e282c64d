
#[bridge_core::ApiBody]
/// Barrrrrrr
enum Bar {
    /// Larkkk
    Lark { foo: String },
    /// barryyyy
    /// Is
    /// God!
    Barry { wibble: usize }
}

#[bridge_core::ApiBody]
#[api_body(tag = "internal_tag")]
enum Wibble {
    /// Larkkk
    Lark { foo: String },
    /// barryyyy
    /// Is
    /// God!
    Barry { wibble: usize },
    /// An inner struct is OK too:
    Inner(Inner)
}

#[bridge_core::ApiBody]
struct Inner {
    a: String,
    b: usize
}

fn main () {

}