//! Values owned by the consumer thread.
//!
//! Objects and functions are reference counted with [`Rc`], so a [`Value`] can never leave the
//! thread that built it. Producers hand over owned Rust data instead and let an
//! [`ArgumentBuilder`](crate::ArgumentBuilder) turn it into values on the consumer thread.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// A dynamically typed value living on the consumer thread.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Buffer(Vec<u8>),
    Array(Vec<Value>),
    Object(Object),
    Function(Function),
}

impl Value {
    /// Creates an object value from key/value pairs.
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Object(Object::from_iter(entries))
    }

    /// Creates an array value.
    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(items.into_iter().collect())
    }

    /// Creates a buffer value holding a copy of `bytes`.
    pub fn buffer(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Buffer(bytes.into())
    }

    /// Creates a function value.
    pub fn function(func: impl Fn(&Value, Vec<Value>) + 'static) -> Self {
        Value::Function(Function::new(func))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether the value can act as a receiver in the way an object does.
    ///
    /// Arrays and buffers count as objects.
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Array(_) | Value::Buffer(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Buffer(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(func) => Some(func),
            _ => None,
        }
    }
}

/// Objects and functions compare by identity, everything else by content.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Buffer(a), Value::Buffer(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! impl_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Number(f64::from(value))
                }
            }
        )*
    };
}

impl_from_number!(i8, i16, i32, u8, u16, u32, f32, f64);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Undefined, Into::into)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::Object(value)
    }
}

impl From<Function> for Value {
    fn from(value: Function) -> Self {
        Value::Function(value)
    }
}

/// A shared, mutable property map.
#[derive(Clone, Default)]
pub struct Object(Rc<RefCell<BTreeMap<String, Value>>>);

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a clone of the property `key`, or [`Value::Undefined`] if it is not set.
    pub fn get(&self, key: &str) -> Value {
        self.0.borrow().get(key).cloned().unwrap_or_default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.borrow_mut().insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let map = iter.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Object(Rc::new(RefCell::new(map)))
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.try_borrow() {
            Ok(map) => f.debug_map().entries(map.iter()).finish(),
            Err(_) => f.write_str("Object { .. }"),
        }
    }
}

/// A shared invocable value.
///
/// The first argument to the closure is the receiver (`this`) the call is made against.
#[derive(Clone)]
pub struct Function(Rc<dyn Fn(&Value, Vec<Value>)>);

impl Function {
    pub fn new(func: impl Fn(&Value, Vec<Value>) + 'static) -> Self {
        Function(Rc::new(func))
    }

    /// Calls the function with `receiver` bound as its receiver.
    pub fn call(&self, receiver: &Value, args: Vec<Value>) {
        (self.0)(receiver, args)
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Function { .. }")
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn object_like_and_function_like() {
        assert!(Value::object::<&str>([]).is_object());
        assert!(Value::array([]).is_object());
        assert!(Value::buffer([1u8, 2]).is_object());
        assert!(Value::function(|_, _| {}).is_function());

        for value in [
            Value::Undefined,
            Value::Null,
            Value::from(true),
            Value::from(3),
            Value::from("s"),
        ] {
            assert!(!value.is_object(), "{value:?}");
            assert!(!value.is_function(), "{value:?}");
        }
    }

    #[test]
    fn objects_compare_by_identity() {
        let a = Object::from_iter([("x", Value::from(1))]);
        let b = Object::from_iter([("x", Value::from(1))]);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);

        a.set("y", "z");
        assert_eq!(a.clone().get("y"), Value::from("z"));
        assert_eq!(a.get("missing"), Value::Undefined);
        assert_eq!(a.keys(), ["x", "y"]);
    }

    #[test]
    fn function_receives_receiver_and_args() {
        let seen = Rc::new(Cell::new(0.0));
        let func = Function::new({
            let seen = seen.clone();
            move |this, args| {
                let base = this.as_object().unwrap().get("base").as_f64().unwrap();
                seen.set(base + args[0].as_f64().unwrap());
            }
        });

        let receiver = Value::object([("base", Value::from(40))]);
        func.call(&receiver, vec![Value::from(2)]);
        assert_eq!(seen.get(), 42.0);
    }

    #[test]
    fn option_maps_to_undefined() {
        assert_eq!(Value::from(None::<i16>), Value::Undefined);
        assert_eq!(Value::from(Some(-4i16)), Value::Number(-4.0));
    }
}
