//! Array built-ins

use super::{error_kind, eval, eval_str};
use jsgate::{ErrorKind, JsValue};

#[test]
fn test_literals_and_indexing() {
    assert_eq!(eval("return [1, 2, 3][1]"), JsValue::Number(2.0));
    assert_eq!(eval("return [1, 2, 3].length"), JsValue::Number(3.0));
    assert_eq!(eval("return [][0]"), JsValue::Undefined);
    assert_eq!(eval("return [1, , 3].length"), JsValue::Number(3.0));
    assert_eq!(eval("let a = [1, 2]; a[0] = 5; return a[0]"), JsValue::Number(5.0));
}

#[test]
fn test_constructor_and_statics() {
    assert_eq!(eval("return Array(3).length"), JsValue::Number(3.0));
    assert_eq!(eval_str("return Array(1, 2).join('|')"), "1|2");
    assert_eq!(eval("return Array.isArray([])"), JsValue::Boolean(true));
    assert_eq!(eval("return Array.isArray({})"), JsValue::Boolean(false));
    assert_eq!(eval_str("return Array.of(7, 8).join()"), "7,8");
    assert_eq!(eval_str("return Array.from('ab').join('-')"), "a-b");
    assert_eq!(eval_str("return Array.from([1, 2], x => x * 10).join()"), "10,20");
    assert_eq!(error_kind("return Array(-1)"), Some(ErrorKind::Range));
}

#[test]
fn test_push_pop_shift_unshift() {
    assert_eq!(eval("let a = [1]; return a.push(2, 3)"), JsValue::Number(3.0));
    assert_eq!(eval("let a = [1, 2]; return a.pop()"), JsValue::Number(2.0));
    assert_eq!(eval("return [].pop()"), JsValue::Undefined);
    assert_eq!(eval("let a = [1, 2]; a.shift(); return a[0]"), JsValue::Number(2.0));
    assert_eq!(eval_str("let a = [3]; a.unshift(1, 2); return a.join()"), "1,2,3");
}

#[test]
fn test_splice() {
    assert_eq!(
        eval_str("let a = [1, 2, 3, 4]; const r = a.splice(1, 2, 'x'); return a.join() + '|' + r.join()"),
        "1,x,4|2,3"
    );
    assert_eq!(eval_str("let a = [1, 2, 3]; a.splice(-1); return a.join()"), "1,2");
}

#[test]
fn test_reverse_sort_fill_copy_within() {
    assert_eq!(eval_str("return [1, 2, 3].reverse().join()"), "3,2,1");
    assert_eq!(eval_str("return [10, 9, 1].sort().join()"), "1,10,9");
    assert_eq!(eval_str("return [10, 9, 1].sort((a, b) => a - b).join()"), "1,9,10");
    assert_eq!(eval_str("return [1, 2, 3, 4].fill(0, 1, 3).join()"), "1,0,0,4");
    assert_eq!(eval_str("return [1, 2, 3, 4, 5].copyWithin(0, 3).join()"), "4,5,3,4,5");
}

#[test]
fn test_sort_is_stable() {
    let src = "
        const people = [{n: 'a', age: 30}, {n: 'b', age: 20}, {n: 'c', age: 30}, {n: 'd', age: 20}]
        return people.sort((x, y) => x.age - y.age).map(p => p.n).join('')
    ";
    assert_eq!(eval_str(src), "bdac");
}

#[test]
fn test_slice_concat_join() {
    assert_eq!(eval_str("return [1, 2, 3, 4].slice(1, 3).join()"), "2,3");
    assert_eq!(eval_str("return [1, 2, 3].slice(-2).join()"), "2,3");
    assert_eq!(eval_str("return [1].concat([2, 3], 4).join()"), "1,2,3,4");
    assert_eq!(eval_str("return [1, null, undefined, 'x'].join('-')"), "1---x");
    assert_eq!(eval_str("return [1, [2, 3]].toString()"), "1,2,3");
}

#[test]
fn test_search() {
    assert_eq!(eval("return [1, 2, 3].indexOf(2)"), JsValue::Number(1.0));
    assert_eq!(eval("return [1, 2, 3].indexOf(4)"), JsValue::Number(-1.0));
    assert_eq!(eval("return [1, 2, 1].lastIndexOf(1)"), JsValue::Number(2.0));
    assert_eq!(eval("return [1, NaN].includes(NaN)"), JsValue::Boolean(true));
    assert_eq!(eval("return [1, NaN].indexOf(NaN)"), JsValue::Number(-1.0));
}

#[test]
fn test_iteration_methods() {
    assert_eq!(eval_str("return [1, 2, 3].map(x => x * 2).join()"), "2,4,6");
    assert_eq!(eval_str("return [1, 2, 3, 4].filter(x => x % 2 == 0).join()"), "2,4");
    assert_eq!(eval("return [1, 2, 3].find(x => x > 1)"), JsValue::Number(2.0));
    assert_eq!(eval("return [1, 2, 3].find(x => x > 5)"), JsValue::Undefined);
    assert_eq!(eval("return [1, 2, 3].findIndex(x => x == 3)"), JsValue::Number(2.0));
    assert_eq!(eval("return [1, 2, 3].some(x => x > 2)"), JsValue::Boolean(true));
    assert_eq!(eval("return [1, 2, 3].every(x => x > 2)"), JsValue::Boolean(false));
    assert_eq!(eval("return [].every(x => false)"), JsValue::Boolean(true));
    assert_eq!(
        eval("let sum = 0; [1, 2, 3].forEach(x => { sum += x }); return sum"),
        JsValue::Number(6.0)
    );
    assert_eq!(
        eval_str("return ['a', 'b'].map((x, i) => x + i).join()"),
        "a0,b1"
    );
}

#[test]
fn test_reduce() {
    assert_eq!(eval("return [1, 2, 3].reduce((a, b) => a + b)"), JsValue::Number(6.0));
    assert_eq!(eval("return [1, 2, 3].reduce((a, b) => a + b, 10)"), JsValue::Number(16.0));
    assert_eq!(
        eval_str("return ['a', 'b', 'c'].reduceRight((acc, x) => acc + x)"),
        "cba"
    );
    assert_eq!(error_kind("return [].reduce((a, b) => a + b)"), Some(ErrorKind::Type));
}

#[test]
fn test_callback_must_be_callable() {
    assert_eq!(error_kind("return [1].map(1)"), Some(ErrorKind::Type));
}

#[test]
fn test_callback_errors_propagate() {
    assert_eq!(
        eval_str("try { [1].forEach(() => { throw 'inner' }) } catch (e) { return e }"),
        "inner"
    );
}
