//! Proxy and Reflect utility wrappers for API interception.
//!
//! All closures installed via these helpers are WASM-compiled functions.
//! When a probing script calls `.toString()` on them, browsers return
//! `"function() { [native code] }"` automatically.
//!
//! Every helper takes an explicit realm (`global`) where it matters, so the
//! same code patches the top window and same-origin frames.

use js_sys::{Array, Function, Object, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

pub type ApplyTrap = Closure<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>;
pub type GetTrap = Closure<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>;

/// Get a constructor's prototype in the given realm
/// (e.g. "HTMLCanvasElement" → HTMLCanvasElement.prototype).
///
/// Returns `undefined` when the constructor does not exist there.
pub fn prototype_in(global: &JsValue, constructor_name: &str) -> Result<JsValue, JsValue> {
    let ctor = Reflect::get(global, &JsValue::from_str(constructor_name))?;
    if ctor.is_undefined() || ctor.is_null() {
        return Ok(JsValue::UNDEFINED);
    }
    Reflect::get(&ctor, &JsValue::from_str("prototype"))
}

/// Get a property from the global scope.
pub fn get_global(prop: &str) -> Result<JsValue, JsValue> {
    Reflect::get(&js_sys::global(), &JsValue::from_str(prop))
}

/// Whether `value` is absent (`undefined` or `null`).
pub fn is_missing(value: &JsValue) -> bool {
    value.is_undefined() || value.is_null()
}

/// Override a property with a getter on an object using Object.defineProperty.
/// The getter closure is a WASM function → native toString().
pub fn patch_getter(
    obj: &JsValue,
    prop_name: &str,
    getter: Closure<dyn FnMut() -> JsValue>,
) -> Result<(), JsValue> {
    let descriptor = Object::new();
    Reflect::set(&descriptor, &JsValue::from_str("get"), getter.as_ref())?;
    Reflect::set(&descriptor, &JsValue::from_str("configurable"), &JsValue::TRUE)?;
    Reflect::set(&descriptor, &JsValue::from_str("enumerable"), &JsValue::TRUE)?;

    // Reflect.defineProperty reports failure as `false`; Object.defineProperty throws,
    // which surfaces non-configurable properties as errors.
    let object_ctor = Reflect::get(&js_sys::global(), &JsValue::from_str("Object"))?;
    let define_prop: Function = Reflect::get(&object_ctor, &JsValue::from_str("defineProperty"))?
        .dyn_into()
        .map_err(|_| JsValue::from_str("Object.defineProperty not found"))?;
    let args = Array::of3(obj, &JsValue::from_str(prop_name), &descriptor);
    Reflect::apply(&define_prop, &JsValue::UNDEFINED, &args)?;

    getter.forget();
    Ok(())
}

/// Getter returning a fixed value.
pub fn patch_constant(obj: &JsValue, prop_name: &str, value: JsValue) -> Result<(), JsValue> {
    let getter = Closure::wrap(Box::new(move || -> JsValue { value.clone() }) as Box<dyn FnMut() -> JsValue>);
    patch_getter(obj, prop_name, getter)
}

fn proxy_ctor() -> Result<Function, JsValue> {
    Reflect::get(&js_sys::global(), &JsValue::from_str("Proxy"))?
        .dyn_into()
        .map_err(|_| JsValue::from_str("Proxy not found"))
}

/// Create a Proxy around a target function with an `apply` trap.
/// The trap receives (target, thisArg, argumentsList).
/// Use this for method interception where you need to call the original
/// and post-process the result.
pub fn proxy_function_with_apply(target: &JsValue, apply_trap: ApplyTrap) -> Result<JsValue, JsValue> {
    let handler = Object::new();
    Reflect::set(&handler, &JsValue::from_str("apply"), apply_trap.as_ref())?;
    apply_trap.forget();

    let args = Array::of2(target, &handler);
    Reflect::construct(&proxy_ctor()?, &args)
}

/// Replace `obj[method_name]` with a proxy of the current method.
///
/// Skips silently when the method does not exist.
pub fn wrap_method(obj: &JsValue, method_name: &str, apply_trap: ApplyTrap) -> Result<(), JsValue> {
    let original = Reflect::get(obj, &JsValue::from_str(method_name))?;
    if !original.is_function() {
        return Ok(());
    }
    let proxied = proxy_function_with_apply(&original, apply_trap)?;
    Reflect::set(obj, &JsValue::from_str(method_name), &proxied)?;
    Ok(())
}

/// Create a Proxy around a constructor whose `construct` and `apply` traps
/// both go through `rewrite_args` before reaching the original.
///
/// Suits constructors that behave the same with or without `new`
/// (e.g. `Intl.DateTimeFormat`).
pub fn proxy_constructor_with_args<F>(target: &JsValue, rewrite_args: F) -> Result<JsValue, JsValue>
where
    F: Fn(&Array) -> Result<Array, JsValue> + 'static,
{
    let rewrite = std::rc::Rc::new(rewrite_args);
    let handler = Object::new();

    let on_construct = rewrite.clone();
    let construct_trap = Closure::wrap(Box::new(
        move |target: JsValue, args: JsValue, new_target: JsValue| -> Result<JsValue, JsValue> {
            let args = on_construct(args.unchecked_ref())?;
            let target: &Function = target.unchecked_ref();
            Reflect::construct_with_new_target(target, &args, new_target.unchecked_ref())
        },
    ) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>);
    Reflect::set(&handler, &JsValue::from_str("construct"), construct_trap.as_ref())?;
    construct_trap.forget();

    let on_apply = rewrite;
    let apply_trap = Closure::wrap(Box::new(
        move |target: JsValue, this_arg: JsValue, args: JsValue| -> Result<JsValue, JsValue> {
            let args = on_apply(args.unchecked_ref())?;
            call_function(&target, &this_arg, &args.into())
        },
    ) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>);
    Reflect::set(&handler, &JsValue::from_str("apply"), apply_trap.as_ref())?;
    apply_trap.forget();

    let args = Array::of2(target, &handler);
    Reflect::construct(&proxy_ctor()?, &args)
}

/// Create a Proxy around an object with a `get` trap.
/// The trap receives (target, property, receiver).
pub fn proxy_object_with_get(target: &JsValue, get_trap: GetTrap) -> Result<JsValue, JsValue> {
    let handler = Object::new();
    Reflect::set(&handler, &JsValue::from_str("get"), get_trap.as_ref())?;
    get_trap.forget();

    let args = Array::of2(target, &handler);
    Reflect::construct(&proxy_ctor()?, &args)
}

/// Call a JS function with arguments via Reflect.apply.
pub fn call_function(func: &JsValue, this_arg: &JsValue, args: &JsValue) -> Result<JsValue, JsValue> {
    let func: &Function = func.unchecked_ref();
    Reflect::apply(func, this_arg, args.unchecked_ref())
}

/// Call `obj[method]()` with no arguments.
pub fn call_method0(obj: &JsValue, method: &str) -> Result<JsValue, JsValue> {
    let func = Reflect::get(obj, &JsValue::from_str(method))?;
    call_function(&func, obj, &Array::new().into())
}

/// Create a frozen JS array of strings.
pub fn frozen_string_array<S: AsRef<str>>(items: &[S]) -> JsValue {
    let arr = Array::new();
    for item in items {
        arr.push(&JsValue::from_str(item.as_ref()));
    }
    Object::freeze(&arr).into()
}
