use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{
    window, HtmlCanvasElement, WebGl2RenderingContext as GL, WebGlProgram, WebGlShader,
    WebGlUniformLocation, WebGlVertexArrayObject,
};

use super::app::AppState;
use crate::error::ExportError;
use crate::gradient::{GradientProgram, FRAGMENT_SHADER, VERTEX_SHADER};
use crate::pixels::PixelBuffer;
use crate::surface::RenderSurface;

struct Uniforms {
    resolution: Option<WebGlUniformLocation>,
    time: Option<WebGlUniformLocation>,
    scale: Option<WebGlUniformLocation>,
    grain: Option<WebGlUniformLocation>,
    palette: Option<WebGlUniformLocation>,
}

/// The live canvas, drawn by the gradient fragment shader.
pub struct GlSurface {
    canvas: HtmlCanvasElement,
    gl: GL,
    program: WebGlProgram,
    vao: WebGlVertexArrayObject,
    uniforms: Uniforms,
    params: GradientProgram,
    time: f32,
}

impl GlSurface {
    pub fn new(canvas: HtmlCanvasElement, params: GradientProgram) -> Result<Self, JsValue> {
        let gl: GL = canvas
            .get_context("webgl2")?
            .ok_or("WebGL2 not supported")?
            .dyn_into()?;

        let vs = compile_shader(&gl, GL::VERTEX_SHADER, VERTEX_SHADER)?;
        let fs = compile_shader(&gl, GL::FRAGMENT_SHADER, FRAGMENT_SHADER)?;
        let program = link_program(&gl, &vs, &fs);
        gl.delete_shader(Some(&vs));
        gl.delete_shader(Some(&fs));
        let program = program?;

        // gl_VertexID needs a bound VAO even with no attributes.
        let vao = gl
            .create_vertex_array()
            .ok_or("cannot create vertex array")?;

        let uniforms = Uniforms {
            resolution: gl.get_uniform_location(&program, "u_resolution"),
            time: gl.get_uniform_location(&program, "u_time"),
            scale: gl.get_uniform_location(&program, "u_scale"),
            grain: gl.get_uniform_location(&program, "u_grain"),
            palette: gl.get_uniform_location(&program, "u_palette"),
        };

        Ok(Self {
            canvas,
            gl,
            program,
            vao,
            uniforms,
            params,
            time: 0.0,
        })
    }

    pub fn set_params(&mut self, params: GradientProgram) {
        self.params = params;
    }

    pub fn set_time(&mut self, time: f32) {
        self.time = time;
    }

    /// Matches the backing store to the element's CSS size times the device
    /// pixel ratio. Returns true when the size changed.
    pub fn fit_to_display(&mut self) -> bool {
        let dpr = window().map(|w| w.device_pixel_ratio()).unwrap_or(1.0);
        let rect = self.canvas.get_bounding_client_rect();
        let width = (rect.width() * dpr).floor().max(1.0) as u32;
        let height = (rect.height() * dpr).floor().max(1.0) as u32;
        if (width, height) == self.size() {
            return false;
        }
        self.resize(width, height);
        true
    }

    /// Draws one live frame at the current size and time.
    pub fn render(&mut self) {
        let (w, h) = self.size();
        if let Err(e) = self.draw(w, h, self.time) {
            log::warn!("frame skipped: {e}");
        }
    }
}

impl RenderSurface for GlSurface {
    fn is_ready(&self) -> bool {
        !self.gl.is_context_lost()
    }

    fn size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
    }

    fn draw(&mut self, width: u32, height: u32, time: f32) -> Result<(), ExportError> {
        if self.gl.is_context_lost() {
            return Err(ExportError::Render("WebGL context lost".to_owned()));
        }
        let gl = &self.gl;
        gl.viewport(0, 0, width as i32, height as i32);
        gl.use_program(Some(&self.program));
        gl.uniform2f(self.uniforms.resolution.as_ref(), width as f32, height as f32);
        gl.uniform1f(self.uniforms.time.as_ref(), time);
        gl.uniform1f(self.uniforms.scale.as_ref(), self.params.scale);
        gl.uniform1f(self.uniforms.grain.as_ref(), self.params.grain);
        let palette: Vec<f32> = self.params.palette.iter().flatten().copied().collect();
        gl.uniform3fv_with_f32_array(self.uniforms.palette.as_ref(), &palette);
        gl.bind_vertex_array(Some(&self.vao));
        gl.draw_arrays(GL::TRIANGLES, 0, 3);
        gl.bind_vertex_array(None);
        Ok(())
    }

    // Reads the default framebuffer straight after the draw, in the same
    // task, so preserveDrawingBuffer is not needed.
    fn read_pixels(&mut self) -> Result<PixelBuffer, ExportError> {
        let (w, h) = self.size();
        // Past MAX_RENDERBUFFER_SIZE the browser silently shrinks the drawing
        // buffer and readPixels pads the rest with zeros.
        let buffer = (
            self.gl.drawing_buffer_width().max(0) as u32,
            self.gl.drawing_buffer_height().max(0) as u32,
        );
        if buffer != (w, h) {
            log::warn!(
                "drawing buffer is {}x{}, canvas is {w}x{h}",
                buffer.0,
                buffer.1
            );
            return Err(ExportError::ContextUnavailable {
                width: w,
                height: h,
            });
        }
        let mut data = vec![0u8; w as usize * h as usize * 4];
        self.gl
            .read_pixels_with_opt_u8_array(
                0,
                0,
                w as i32,
                h as i32,
                GL::RGBA,
                GL::UNSIGNED_BYTE,
                Some(&mut data),
            )
            .map_err(|e| ExportError::Render(format!("readPixels failed: {e:?}")))?;
        PixelBuffer::from_raw(w, h, data)
    }

    fn time(&self) -> f32 {
        self.time
    }
}

fn compile_shader(gl: &GL, kind: u32, source: &str) -> Result<WebGlShader, JsValue> {
    let shader = gl.create_shader(kind).ok_or("cannot create shader")?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);
    let ok = gl
        .get_shader_parameter(&shader, GL::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false);
    if ok {
        Ok(shader)
    } else {
        let info = gl.get_shader_info_log(&shader).unwrap_or_default();
        gl.delete_shader(Some(&shader));
        Err(JsValue::from_str(&format!("shader compile error:\n{info}")))
    }
}

fn link_program(gl: &GL, vs: &WebGlShader, fs: &WebGlShader) -> Result<WebGlProgram, JsValue> {
    let program = gl.create_program().ok_or("cannot create program")?;
    gl.attach_shader(&program, vs);
    gl.attach_shader(&program, fs);
    gl.link_program(&program);
    let ok = gl
        .get_program_parameter(&program, GL::LINK_STATUS)
        .as_bool()
        .unwrap_or(false);
    gl.detach_shader(&program, vs);
    gl.detach_shader(&program, fs);
    if ok {
        Ok(program)
    } else {
        let info = gl.get_program_info_log(&program).unwrap_or_default();
        gl.delete_program(Some(&program));
        Err(JsValue::from_str(&format!("program link error:\n{info}")))
    }
}

/// Start the resize listener and the animation loop driving `state`.
pub(crate) fn start(state: Rc<RefCell<AppState>>) -> Result<(), JsValue> {
    let window = window().ok_or("no window")?;
    state.borrow_mut().fit_and_render();

    // Keep the backing store in step with the element on window resize.
    let resize_closure = {
        let state = state.clone();
        Closure::wrap(Box::new(move || {
            if let Ok(mut state) = state.try_borrow_mut() {
                state.fit_and_render();
            }
        }) as Box<dyn FnMut()>)
    };
    window.add_event_listener_with_callback("resize", resize_closure.as_ref().unchecked_ref())?;
    resize_closure.forget();

    // Animation loop
    // `f` holds the animation-frame closure so that we can keep calling
    // `request_animation_frame` recursively. Storing it inside an `Option`
    // allows us to create the `Closure` first and then obtain a reference to
    // it from within itself.
    let f: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
    let g = f.clone();
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |now_ms: f64| {
        // An export holds the state for its whole duration; skip the frame.
        if let Ok(mut state) = state.try_borrow_mut() {
            state.frame(now_ms);
        }

        // schedule next
        let next = f.borrow();
        if let (Some(window), Some(cb)) = (web_sys::window(), next.as_ref()) {
            if let Err(e) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                log::error!("requestAnimationFrame failed: {e:?}");
            }
        }
    }) as Box<dyn FnMut(f64)>));

    let first = g.borrow();
    let cb = first.as_ref().ok_or("animation closure missing")?;
    window.request_animation_frame(cb.as_ref().unchecked_ref())?;

    Ok(())
}
